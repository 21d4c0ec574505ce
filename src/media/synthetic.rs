//! Deterministic in-memory media, used for tests and dry runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::foundation::error::{StitchError, StitchResult};
use crate::media::source::{
    AudioPcm, MIX_CHANNELS, MediaInfo, MediaProvider, MediaStream, OpenOptions, VideoFrame,
};
use crate::model::MediaRef;

/// Description of one synthetic media resource.
#[derive(Clone, Debug)]
pub struct SyntheticMedia {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    /// Straight-alpha colour of every frame.
    pub rgba: [u8; 4],
    /// Constant `[left, right]` sample value; `None` means no audio track.
    pub audio: Option<[f32; 2]>,
    pub fail_open: bool,
    pub fail_seek: bool,
}

impl SyntheticMedia {
    pub fn solid(duration_secs: f64, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            duration_secs,
            width,
            height,
            rgba,
            audio: None,
            fail_open: false,
            fail_seek: false,
        }
    }

    pub fn with_audio(mut self, left: f32, right: f32) -> Self {
        self.audio = Some([left, right]);
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_seek(mut self) -> Self {
        self.fail_seek = true;
        self
    }
}

/// [`MediaProvider`] serving registered [`SyntheticMedia`] by reference string.
///
/// It counts streams that are alive, which lets callers assert that every opened stream was
/// released.
#[derive(Clone, Debug, Default)]
pub struct SyntheticProvider {
    media: HashMap<String, SyntheticMedia>,
    live: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, media: impl Into<String>, desc: SyntheticMedia) {
        self.media.insert(media.into(), desc);
    }

    pub fn with(mut self, media: impl Into<String>, desc: SyntheticMedia) -> Self {
        self.insert(media, desc);
        self
    }

    /// Streams opened and not yet dropped.
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Streams opened over the provider's lifetime.
    pub fn opened_streams(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn lookup(&self, media: &MediaRef) -> StitchResult<&SyntheticMedia> {
        self.media
            .get(media.as_str())
            .ok_or_else(|| StitchError::evaluation(format!("unknown synthetic media '{media}'")))
    }
}

impl MediaProvider for SyntheticProvider {
    fn open(&self, media: &MediaRef, opts: &OpenOptions) -> StitchResult<Box<dyn MediaStream>> {
        let desc = self.lookup(media)?;
        if desc.fail_open {
            return Err(StitchError::evaluation("media never became ready"));
        }
        if !desc.duration_secs.is_finite() || desc.duration_secs <= 0.0 {
            return Err(StitchError::evaluation("media duration is unknown"));
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        let total_frames = opts.fps.secs_to_frames_round(desc.duration_secs);
        let total_samples = (desc.duration_secs * f64::from(opts.sample_rate)).round() as u64;
        Ok(Box::new(SyntheticStream {
            info: MediaInfo {
                duration_secs: desc.duration_secs,
                width: desc.width,
                height: desc.height,
                has_audio: desc.audio.is_some(),
            },
            frame: VideoFrame::solid(desc.width, desc.height, desc.rgba),
            audio: desc.audio,
            fail_seek: desc.fail_seek,
            fps: opts.fps,
            sample_rate: opts.sample_rate,
            total_frames,
            total_samples,
            next_frame: 0,
            next_sample: 0,
            playing: false,
            live: Arc::clone(&self.live),
        }))
    }

    fn decode_audio(&self, media: &MediaRef, sample_rate: u32) -> StitchResult<AudioPcm> {
        let desc = self.lookup(media)?;
        if desc.fail_open {
            return Err(StitchError::evaluation("audio source could not be decoded"));
        }
        let frames = (desc.duration_secs * f64::from(sample_rate)).round().max(0.0) as usize;
        let [l, r] = desc.audio.unwrap_or([0.0, 0.0]);
        let mut interleaved_f32 = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            interleaved_f32.push(l);
            interleaved_f32.push(r);
        }
        Ok(AudioPcm {
            sample_rate,
            channels: MIX_CHANNELS,
            interleaved_f32,
        })
    }
}

struct SyntheticStream {
    info: MediaInfo,
    frame: VideoFrame,
    audio: Option<[f32; 2]>,
    fail_seek: bool,
    fps: crate::foundation::core::Fps,
    sample_rate: u32,
    total_frames: u64,
    total_samples: u64,
    next_frame: u64,
    next_sample: u64,
    playing: bool,
    live: Arc<AtomicUsize>,
}

impl MediaStream for SyntheticStream {
    fn info(&self) -> &MediaInfo {
        &self.info
    }

    fn seek(&mut self, at_secs: f64) -> StitchResult<()> {
        if self.fail_seek {
            return Err(StitchError::evaluation("seek target unreachable"));
        }
        if !at_secs.is_finite() || at_secs < 0.0 || at_secs >= self.info.duration_secs {
            return Err(StitchError::evaluation(format!(
                "seek target {at_secs}s is outside the media duration ({}s)",
                self.info.duration_secs
            )));
        }
        self.next_frame = self.fps.secs_to_frames_round(at_secs);
        self.next_sample = (at_secs * f64::from(self.sample_rate)).round() as u64;
        self.playing = true;
        Ok(())
    }

    fn next_frame(&mut self) -> StitchResult<Option<VideoFrame>> {
        if !self.playing || self.next_frame >= self.total_frames {
            return Ok(None);
        }
        self.next_frame += 1;
        Ok(Some(self.frame.clone()))
    }

    fn read_audio(&mut self, frames: usize, out: &mut Vec<f32>) -> StitchResult<()> {
        let [l, r] = match self.audio {
            Some(levels) if self.playing => levels,
            _ => [0.0, 0.0],
        };
        for _ in 0..frames {
            if self.next_sample < self.total_samples {
                out.push(l);
                out.push(r);
                self.next_sample += 1;
            } else {
                out.push(0.0);
                out.push(0.0);
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/synthetic.rs"]
mod tests;
