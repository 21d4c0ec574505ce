//! Pure transition math: progress, gains and per-layer placement for a given `t`.

use kurbo::{Affine, Rect};

use crate::foundation::math::unit_clamp;
use crate::model::TransitionKind;

/// Normalised transition progress `t` in `[0, 1]`.
///
/// A zero (or otherwise non-positive) duration is already complete.
pub fn progress(elapsed_secs: f64, duration_secs: f64) -> f64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return 1.0;
    }
    unit_clamp(elapsed_secs / duration_secs)
}

/// `(outgoing, incoming)` audio gains for progress `t`.
pub fn crossfade_gains(t: f64) -> (f64, f64) {
    let t = unit_clamp(t);
    (1.0 - t, t)
}

/// Scale-and-centre transform mapping a `src_w x src_h` frame onto `out_w x out_h` with full
/// coverage. Overflow on one axis is cropped; no letterboxing is produced.
pub fn cover_fit(src_w: u32, src_h: u32, out_w: u32, out_h: u32) -> Affine {
    let (sw, sh) = (f64::from(src_w.max(1)), f64::from(src_h.max(1)));
    let (ow, oh) = (f64::from(out_w), f64::from(out_h));
    let scale = (ow / sw).max(oh / sh);
    let dx = (ow - sw * scale) * 0.5;
    let dy = (oh - sh * scale) * 0.5;
    Affine::translate((dx, dy)) * Affine::scale(scale)
}

/// How one of the two layers is drawn during a transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerPlacement {
    /// Horizontal offset in output pixels.
    pub offset_x: f64,
    pub opacity: f32,
    /// Output-space rectangle the layer is restricted to; `None` draws it whole.
    pub reveal: Option<Rect>,
}

impl LayerPlacement {
    pub const FULL: Self = Self {
        offset_x: 0.0,
        opacity: 1.0,
        reveal: None,
    };
    pub const HIDDEN: Self = Self {
        offset_x: 0.0,
        opacity: 0.0,
        reveal: None,
    };

    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0 && self.reveal.is_none_or(|r| r.area() > 0.0)
    }
}

/// Outgoing layer is drawn first, incoming on top.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransitionLayers {
    pub outgoing: LayerPlacement,
    pub incoming: LayerPlacement,
}

/// Incoming reveal rectangle for the wipe kinds, `None` for everything else.
pub fn wipe_reveal_rect(kind: TransitionKind, t: f64, width: u32, height: u32) -> Option<Rect> {
    let t = unit_clamp(t);
    let (w, h) = (f64::from(width), f64::from(height));
    match kind {
        TransitionKind::WipeLeft => Some(Rect::new(w * (1.0 - t), 0.0, w, h)),
        TransitionKind::WipeRight => Some(Rect::new(0.0, 0.0, w * t, h)),
        _ => None,
    }
}

pub fn transition_layers(kind: TransitionKind, t: f64, width: u32, height: u32) -> TransitionLayers {
    let t = unit_clamp(t);
    let w = f64::from(width);
    match kind {
        TransitionKind::Fade => TransitionLayers {
            outgoing: LayerPlacement::FULL,
            incoming: LayerPlacement {
                opacity: t as f32,
                ..LayerPlacement::FULL
            },
        },
        TransitionKind::WipeLeft | TransitionKind::WipeRight => TransitionLayers {
            outgoing: LayerPlacement::FULL,
            incoming: LayerPlacement {
                reveal: wipe_reveal_rect(kind, t, width, height),
                ..LayerPlacement::FULL
            },
        },
        TransitionKind::SlideLeft => TransitionLayers {
            outgoing: LayerPlacement {
                offset_x: -w * t,
                ..LayerPlacement::FULL
            },
            incoming: LayerPlacement {
                offset_x: w * (1.0 - t),
                ..LayerPlacement::FULL
            },
        },
        TransitionKind::SlideRight => TransitionLayers {
            outgoing: LayerPlacement {
                offset_x: w * t,
                ..LayerPlacement::FULL
            },
            incoming: LayerPlacement {
                offset_x: -w * (1.0 - t),
                ..LayerPlacement::FULL
            },
        },
        // Hard cut: no blended frame, the incoming clip only appears once complete.
        TransitionKind::None => {
            if t >= 1.0 {
                TransitionLayers {
                    outgoing: LayerPlacement::HIDDEN,
                    incoming: LayerPlacement::FULL,
                }
            } else {
                TransitionLayers {
                    outgoing: LayerPlacement::FULL,
                    incoming: LayerPlacement::HIDDEN,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/transition.rs"]
mod tests;
