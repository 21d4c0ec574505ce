//! Clip Source Loader: binds a clip's media to a slot and performs the exact seek.

use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{StitchError, StitchResult};
use crate::media::source::{MediaProvider, MediaStream, OpenOptions};
use crate::model::Clip;
use crate::session::pool::Slot;

/// Opens and seeks clip media on behalf of the slot pool.
///
/// `load` and `seek` are the stitch's suspension points; each checks the cancel token on entry and
/// on return so an abort never waits for more than one blocking call.
pub struct ClipLoader<'a> {
    provider: &'a dyn MediaProvider,
    opts: OpenOptions,
    cancel: &'a CancelToken,
}

impl<'a> ClipLoader<'a> {
    pub fn new(provider: &'a dyn MediaProvider, opts: OpenOptions, cancel: &'a CancelToken) -> Self {
        Self {
            provider,
            opts,
            cancel,
        }
    }

    /// Bind `clip` to `slot`, replacing whatever the slot held, and wait for its metadata.
    pub fn load(&self, slot: &mut Slot, clip_index: usize, clip: &Clip) -> StitchResult<()> {
        self.cancel.check()?;
        slot.release();

        let stream = self
            .provider
            .open(&clip.media, &self.opts)
            .map_err(|e| StitchError::load(&clip.id, detail_of(e)))?;
        self.cancel.check()?;

        let info = stream.info();
        if info.width == 0 || info.height == 0 {
            return Err(StitchError::load(&clip.id, "media reports zero frame dimensions"));
        }
        if info.duration_secs + 1e-3 < clip.duration {
            tracing::warn!(
                clip = %clip.id,
                declared = clip.duration,
                probed = info.duration_secs,
                "media is shorter than its declared duration"
            );
        }
        tracing::debug!(
            clip = %clip.id,
            duration = info.duration_secs,
            width = info.width,
            height = info.height,
            has_audio = info.has_audio,
            "clip loaded"
        );
        slot.bind(clip_index, &clip.id, stream);
        Ok(())
    }

    /// Seek the slot's stream to `at_secs` and wait until the first frame there is decoded.
    pub fn seek(&self, slot: &mut Slot, at_secs: f64) -> StitchResult<()> {
        self.cancel.check()?;
        let clip_id = slot.clip_id().unwrap_or_default().to_string();
        let stream: &mut dyn MediaStream = slot
            .stream_mut()
            .ok_or_else(|| StitchError::seek(&clip_id, at_secs, "slot has no loaded media"))?;
        stream
            .seek(at_secs)
            .map_err(|e| StitchError::seek(&clip_id, at_secs, detail_of(e)))?;
        slot.mark_seeked();
        self.cancel.check()?;
        tracing::debug!(clip = %clip_id, at_secs, "seek complete");
        Ok(())
    }
}

/// Strip the provider error's own prefix when it is one of ours.
fn detail_of(e: StitchError) -> String {
    match e {
        StitchError::Evaluation(msg) | StitchError::Validation(msg) => msg,
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/loader.rs"]
mod tests;
