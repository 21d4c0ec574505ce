//! Burned-in captions: Parley layout, drawn with `vello_cpu` as shadow, outline and fill.

use std::collections::HashMap;
use std::path::Path;

use crate::foundation::core::Canvas;
use crate::foundation::error::{StitchError, StitchResult};

/// Fraction of the output width captions may use.
const MAX_WIDTH_FRAC: f32 = 0.8;
/// The last caption line sits on this fraction of the output height.
const BOTTOM_FRAC: f32 = 0.9;

/// Builds Parley layouts for one font registered up front.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    family_name: String,
}

impl TextLayoutEngine {
    pub(crate) fn new(font_bytes: &[u8]) -> StitchResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            StitchError::validation("no font families registered from caption font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| StitchError::validation("caption font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    /// Shape `text` and break it into lines no wider than `max_width_px`.
    pub(crate) fn layout(
        &mut self,
        text: &str,
        size_px: f32,
        max_width_px: f32,
    ) -> StitchResult<parley::Layout<()>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(StitchError::validation(
                "caption size_px must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(Some(max_width_px));
        layout.align(
            Some(max_width_px),
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        Ok(layout)
    }
}

/// Caption glyphs already positioned in output-canvas coordinates.
#[derive(Clone, Debug)]
struct PlacedCaption {
    font_size: f32,
    glyphs: Vec<vello_cpu::Glyph>,
}

/// Lays out each clip's caption once and draws it on demand.
pub struct CaptionRenderer {
    canvas: Canvas,
    font_px: f32,
    font: vello_cpu::peniko::FontData,
    engine: TextLayoutEngine,
    placed: HashMap<usize, PlacedCaption>,
}

impl CaptionRenderer {
    pub fn from_font_file(path: &Path, font_px: f32, canvas: Canvas) -> StitchResult<Self> {
        use anyhow::Context as _;

        let bytes = std::fs::read(path)
            .with_context(|| format!("read caption font '{}'", path.display()))?;
        Self::new(bytes, font_px, canvas)
    }

    pub fn new(font_bytes: Vec<u8>, font_px: f32, canvas: Canvas) -> StitchResult<Self> {
        let engine = TextLayoutEngine::new(&font_bytes)?;
        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);
        Ok(Self {
            canvas,
            font_px,
            font,
            engine,
            placed: HashMap::new(),
        })
    }

    pub fn font_px(&self) -> f32 {
        self.font_px
    }

    /// Lay out the caption for `clip` (a timeline index). Blank text clears it.
    pub fn prepare(&mut self, clip: usize, text: &str) -> StitchResult<()> {
        let text = text.trim();
        if text.is_empty() {
            self.placed.remove(&clip);
            return Ok(());
        }

        let canvas_w = self.canvas.width as f32;
        let max_w = canvas_w * MAX_WIDTH_FRAC;
        let layout = self.engine.layout(text, self.font_px, max_w)?;

        let mut block_h = 0.0f32;
        for line in layout.lines() {
            let m = line.metrics();
            block_h += m.ascent + m.descent + m.leading;
        }
        let origin_y = self.canvas.height as f32 * BOTTOM_FRAC - block_h;

        let mut glyphs = Vec::new();
        let mut font_size = self.font_px;
        for line in layout.lines() {
            let m = line.metrics();
            let line_w = (m.advance - m.trailing_whitespace).max(0.0);
            let dx = (canvas_w - line_w) * 0.5;
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                font_size = run.run().font_size();
                glyphs.extend(run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x + dx,
                    y: g.y + origin_y,
                }));
            }
        }

        tracing::debug!(clip, lines = layout.lines().count(), "caption laid out");
        self.placed.insert(clip, PlacedCaption { font_size, glyphs });
        Ok(())
    }

    pub fn has_caption(&self, clip: usize) -> bool {
        self.placed.contains_key(&clip)
    }

    /// Draw `clip`'s caption into `ctx` in canvas space. No-op when the clip has none.
    pub(crate) fn draw(&self, ctx: &mut vello_cpu::RenderContext, clip: usize) {
        let Some(caption) = self.placed.get(&clip) else {
            return;
        };
        let shadow = (self.font_px / 20.0).round().max(1.0) as f64;
        let stroke_w = f64::from(self.font_px / 8.0);

        ctx.set_transform(vello_cpu::kurbo::Affine::translate((shadow, shadow)));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 153));
        ctx.glyph_run(&self.font)
            .font_size(caption.font_size)
            .fill_glyphs(caption.glyphs.iter().cloned());

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(stroke_w));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
        ctx.glyph_run(&self.font)
            .font_size(caption.font_size)
            .stroke_glyphs(caption.glyphs.iter().cloned());

        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        ctx.glyph_run(&self.font)
            .font_size(caption.font_size)
            .fill_glyphs(caption.glyphs.iter().cloned());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/caption.rs"]
mod tests;
