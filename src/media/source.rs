use std::sync::Arc;

use crate::foundation::core::Fps;
use crate::foundation::error::StitchResult;
use crate::model::MediaRef;

/// Internal audio mixing sample rate used across decode/mix/encode.
pub const MIX_SAMPLE_RATE: u32 = 48_000;
/// Mixed audio is always interleaved stereo.
pub const MIX_CHANNELS: u16 = 2;

/// Metadata known once a media source is ready.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
}

/// One decoded video frame, straight-alpha RGBA8 at the source's native size.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

impl VideoFrame {
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            rgba: Arc::new(data),
        }
    }
}

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug, Default)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }
}

/// Decode parameters fixed for the whole stitch.
#[derive(Clone, Copy, Debug)]
pub struct OpenOptions {
    /// Rate at which `MediaStream::next_frame` yields frames.
    pub fps: Fps,
    /// Rate at which `MediaStream::read_audio` yields stereo frames.
    pub sample_rate: u32,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            sample_rate: MIX_SAMPLE_RATE,
        }
    }
}

/// Source of playable media.
pub trait MediaProvider {
    /// Bind `media` and block until its duration and frame dimensions are known.
    fn open(&self, media: &MediaRef, opts: &OpenOptions) -> StitchResult<Box<dyn MediaStream>>;

    /// Decode a whole audio file to stereo PCM at `sample_rate`.
    fn decode_audio(&self, media: &MediaRef, sample_rate: u32) -> StitchResult<AudioPcm>;
}

/// An opened media source bound to one slot.
pub trait MediaStream {
    fn info(&self) -> &MediaInfo;

    /// Exact seek; returns once the first frame at `at_secs` is decoded.
    fn seek(&mut self, at_secs: f64) -> StitchResult<()>;

    /// Next frame at the output rate, `None` once the media is exhausted.
    fn next_frame(&mut self) -> StitchResult<Option<VideoFrame>>;

    /// Append exactly `frames` interleaved stereo frames to `out`, padding with silence once the
    /// media has no more audio.
    fn read_audio(&mut self, frames: usize, out: &mut Vec<f32>) -> StitchResult<()>;

    /// Stop decoding and release decoder resources. The stream may be seeked again afterwards.
    fn stop(&mut self) {}
}
