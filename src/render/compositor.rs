//! Frame Compositor: cover-fit video layers, transition effects and caption overlay on one
//! `vello_cpu` surface.

use std::sync::Arc;

use kurbo::{Affine, Rect};

use crate::foundation::core::{Canvas, FrameRGBA};
use crate::foundation::error::{StitchError, StitchResult};
use crate::foundation::math::mul_div255_u16;
use crate::media::source::VideoFrame;
use crate::model::TransitionKind;
use crate::render::caption::CaptionRenderer;
use crate::render::transition::{LayerPlacement, cover_fit, transition_layers};

/// The single output surface of a stitch.
pub struct Compositor {
    canvas: Canvas,
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
    captions: Option<CaptionRenderer>,
}

impl Compositor {
    pub fn new(canvas: Canvas, captions: Option<CaptionRenderer>) -> StitchResult<Self> {
        canvas.validate()?;
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| StitchError::validation("canvas width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| StitchError::validation("canvas height exceeds u16"))?;
        Ok(Self {
            canvas,
            width,
            height,
            ctx: vello_cpu::RenderContext::new(width, height),
            pixmap: vello_cpu::Pixmap::new(width, height),
            captions,
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// One clip alone, with `caption_clip`'s caption on top.
    pub fn render_solo(
        &mut self,
        frame: Option<&VideoFrame>,
        caption_clip: Option<usize>,
    ) -> StitchResult<FrameRGBA> {
        self.begin();
        if let Some(frame) = frame {
            self.draw_layer(frame, LayerPlacement::FULL)?;
        }
        self.finish(caption_clip)
    }

    /// Both clips at transition progress `t`. The caption stays the outgoing clip's until the swap.
    pub fn render_transition(
        &mut self,
        outgoing: Option<&VideoFrame>,
        incoming: Option<&VideoFrame>,
        kind: TransitionKind,
        t: f64,
        caption_clip: Option<usize>,
    ) -> StitchResult<FrameRGBA> {
        self.begin();
        let layers = transition_layers(kind, t, self.canvas.width, self.canvas.height);
        if let Some(frame) = outgoing
            && layers.outgoing.is_visible()
        {
            self.draw_layer(frame, layers.outgoing)?;
        }
        if let Some(frame) = incoming
            && layers.incoming.is_visible()
        {
            self.draw_layer(frame, layers.incoming)?;
        }
        self.finish(caption_clip)
    }

    fn begin(&mut self) {
        self.ctx.reset();
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));
    }

    fn draw_layer(&mut self, frame: &VideoFrame, placement: LayerPlacement) -> StitchResult<()> {
        let paint = video_frame_paint(frame)?;
        let tr = Affine::translate((placement.offset_x, 0.0))
            * cover_fit(frame.width, frame.height, self.canvas.width, self.canvas.height);

        let src_bounds = Rect::new(0.0, 0.0, f64::from(frame.width), f64::from(frame.height));
        let fill = match placement.reveal {
            // The reveal is in output space; under a scale+translate transform its preimage is
            // another axis-aligned rectangle.
            Some(reveal) => tr.inverse().transform_rect_bbox(reveal).intersect(src_bounds),
            None => src_bounds,
        };
        if fill.area() <= 0.0 {
            return Ok(());
        }

        self.ctx.set_transform(affine_to_cpu(tr));
        self.ctx.set_paint(paint);
        let opacity = placement.opacity.clamp(0.0, 1.0);
        if opacity < 1.0 {
            self.ctx.push_opacity_layer(opacity);
        }
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            fill.x0, fill.y0, fill.x1, fill.y1,
        ));
        if opacity < 1.0 {
            self.ctx.pop_layer();
        }
        Ok(())
    }

    fn finish(&mut self, caption_clip: Option<usize>) -> StitchResult<FrameRGBA> {
        if let (Some(captions), Some(clip)) = (self.captions.as_ref(), caption_clip) {
            captions.draw(&mut self.ctx, clip);
        }
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.pixmap);

        let data = self.pixmap.data_as_u8_slice().to_vec();
        if data.len() != self.canvas.byte_len() {
            return Err(StitchError::evaluation("output surface byte len mismatch"));
        }
        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data,
            premultiplied: true,
        })
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

/// Wrap a straight-alpha decoded frame as a premultiplied `vello_cpu` image paint.
fn video_frame_paint(frame: &VideoFrame) -> StitchResult<vello_cpu::Image> {
    let w: u16 = frame
        .width
        .try_into()
        .map_err(|_| StitchError::evaluation("video frame width exceeds u16"))?;
    let h: u16 = frame
        .height
        .try_into()
        .map_err(|_| StitchError::evaluation("video frame height exceeds u16"))?;
    let expected = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected {
        return Err(StitchError::evaluation(format!(
            "video frame byte len mismatch: expected {expected}, got {}",
            frame.rgba.len()
        )));
    }

    let mut opaque = true;
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(expected / 4);
    for px in frame.rgba.chunks_exact(4) {
        let a = u16::from(px[3]);
        opaque &= px[3] == 255;
        let premul = |c: u8| mul_div255_u16(u16::from(c), a) as u8;
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            premul(px[0]),
            premul(px[1]),
            premul(px[2]),
            px[3],
        ]));
    }
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, !opaque);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
