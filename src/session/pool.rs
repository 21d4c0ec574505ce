//! Dual-slot player pool.
//!
//! Exactly two slots exist for the whole stitch. Their roles are an explicit two-state enum rather
//! than index arithmetic: one slot is `Current` (on screen), the other `Standby` (pre-loading the
//! next clip, or incoming during a transition).

use crate::foundation::error::{StitchError, StitchResult};
use crate::foundation::math::unit_clamp;
use crate::media::source::{MediaStream, VideoFrame};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotId {
    A,
    B,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotRole {
    Current,
    Standby,
}

impl SlotRole {
    fn flipped(self) -> Self {
        match self {
            Self::Current => Self::Standby,
            Self::Standby => Self::Current,
        }
    }
}

/// One playback slot: a media stream, its volume control and the frame last shown.
pub struct Slot {
    id: SlotId,
    stream: Option<Box<dyn MediaStream>>,
    clip_index: Option<usize>,
    clip_id: Option<String>,
    seeked: bool,
    volume: f64,
    last_frame: Option<VideoFrame>,
    exhausted: bool,
}

impl Slot {
    fn new(id: SlotId) -> Self {
        Self {
            id,
            stream: None,
            clip_index: None,
            clip_id: None,
            seeked: false,
            volume: 1.0,
            last_frame: None,
            exhausted: false,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn clip_index(&self) -> Option<usize> {
        self.clip_index
    }

    pub fn clip_id(&self) -> Option<&str> {
        self.clip_id.as_deref()
    }

    /// Loaded and seeked, so frames and audio can be pulled.
    pub fn is_ready(&self) -> bool {
        self.stream.is_some() && self.seeked
    }

    pub fn has_media(&self) -> bool {
        self.stream.is_some()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Set the slot gain, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = unit_clamp(volume);
    }

    pub(crate) fn bind(&mut self, clip_index: usize, clip_id: &str, stream: Box<dyn MediaStream>) {
        self.release();
        self.stream = Some(stream);
        self.clip_index = Some(clip_index);
        self.clip_id = Some(clip_id.to_string());
    }

    pub(crate) fn stream_mut(&mut self) -> Option<&mut (dyn MediaStream + 'static)> {
        self.stream.as_deref_mut()
    }

    pub(crate) fn mark_seeked(&mut self) {
        self.seeked = true;
        self.last_frame = None;
        self.exhausted = false;
    }

    /// Advance one output tick and return the frame to show.
    ///
    /// Once the media runs out the last decoded frame is held.
    pub fn pull_frame(&mut self) -> StitchResult<Option<&VideoFrame>> {
        if !self.is_ready() {
            return Err(StitchError::evaluation(format!(
                "slot {:?} pulled before load and seek completed",
                self.id
            )));
        }
        if !self.exhausted
            && let Some(stream) = self.stream.as_deref_mut()
        {
            match stream.next_frame()? {
                Some(frame) => self.last_frame = Some(frame),
                None => {
                    self.exhausted = true;
                    tracing::warn!(
                        clip = self.clip_id.as_deref().unwrap_or_default(),
                        "media exhausted early; holding last frame"
                    );
                }
            }
        }
        Ok(self.last_frame.as_ref())
    }

    /// Append `frames` stereo frames of this slot's audio, silence when nothing is bound.
    pub fn pull_audio(&mut self, frames: usize, out: &mut Vec<f32>) -> StitchResult<()> {
        match self.stream.as_deref_mut() {
            Some(stream) if self.seeked => {
                let before = out.len();
                stream.read_audio(frames, out)?;
                // Pad short provider reads with silence.
                out.resize(before + frames * 2, 0.0);
                Ok(())
            }
            _ => {
                out.extend(std::iter::repeat_n(0.0f32, frames * 2));
                Ok(())
            }
        }
    }

    /// Stop playback; the media stays bound until the slot is reloaded or released.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.as_deref_mut() {
            stream.stop();
        }
        self.seeked = false;
    }

    /// Stop and drop the bound media.
    pub fn release(&mut self) {
        self.stop();
        self.stream = None;
        self.clip_index = None;
        self.clip_id = None;
        self.last_frame = None;
        self.exhausted = false;
        self.volume = 1.0;
    }
}

/// The two slots plus their role assignment.
pub struct SlotPool {
    a: Slot,
    b: Slot,
    a_role: SlotRole,
}

impl Default for SlotPool {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotPool {
    /// Fresh pool; slot A starts as standby so the first load lands there.
    pub fn new() -> Self {
        Self {
            a: Slot::new(SlotId::A),
            b: Slot::new(SlotId::B),
            a_role: SlotRole::Standby,
        }
    }

    pub fn role_of(&self, id: SlotId) -> SlotRole {
        match id {
            SlotId::A => self.a_role,
            SlotId::B => self.a_role.flipped(),
        }
    }

    pub fn current_id(&self) -> SlotId {
        match self.a_role {
            SlotRole::Current => SlotId::A,
            SlotRole::Standby => SlotId::B,
        }
    }

    pub fn standby_id(&self) -> SlotId {
        match self.a_role {
            SlotRole::Current => SlotId::B,
            SlotRole::Standby => SlotId::A,
        }
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        match id {
            SlotId::A => &self.a,
            SlotId::B => &self.b,
        }
    }

    pub fn current(&self) -> &Slot {
        self.slot(self.current_id())
    }

    pub fn standby(&self) -> &Slot {
        self.slot(self.standby_id())
    }

    pub fn current_mut(&mut self) -> &mut Slot {
        match self.current_id() {
            SlotId::A => &mut self.a,
            SlotId::B => &mut self.b,
        }
    }

    pub fn standby_mut(&mut self) -> &mut Slot {
        match self.standby_id() {
            SlotId::A => &mut self.a,
            SlotId::B => &mut self.b,
        }
    }

    /// `(current, standby)` borrowed together.
    pub fn pair_mut(&mut self) -> (&mut Slot, &mut Slot) {
        match self.a_role {
            SlotRole::Current => (&mut self.a, &mut self.b),
            SlotRole::Standby => (&mut self.b, &mut self.a),
        }
    }

    /// Stop the outgoing slot, reset both volumes to full and exchange roles.
    pub fn swap(&mut self) {
        self.current_mut().stop();
        self.a.set_volume(1.0);
        self.b.set_volume(1.0);
        self.a_role = self.a_role.flipped();
        tracing::debug!(current = ?self.current_id(), "slots swapped");
    }

    /// Release both slots' media.
    pub fn release(&mut self) {
        self.a.release();
        self.b.release();
    }
}

impl Drop for SlotPool {
    fn drop(&mut self) {
        self.release();
    }
}

/// Per-clip playback phase: `Init -> SoloPlay -> (Transitioning -> Swap)? -> Done`.
///
/// A hard cut goes `SoloPlay -> Swap`; the last clip goes `SoloPlay -> Done`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClipPhase {
    #[default]
    Init,
    SoloPlay,
    Transitioning,
    Swap,
    Done,
}

impl ClipPhase {
    pub fn can_advance_to(self, next: ClipPhase) -> bool {
        use ClipPhase::*;
        matches!(
            (self, next),
            (Init, SoloPlay)
                | (SoloPlay, Transitioning)
                | (SoloPlay, Swap)
                | (SoloPlay, Done)
                | (Transitioning, Swap)
                | (Swap, Done)
        )
    }

    /// Move to `next`, rejecting out-of-order phases.
    pub fn advance(&mut self, next: ClipPhase) -> StitchResult<()> {
        if !self.can_advance_to(next) {
            return Err(StitchError::evaluation(format!(
                "illegal clip phase change {self:?} -> {next:?}"
            )));
        }
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/pool.rs"]
mod tests;
