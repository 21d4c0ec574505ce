//! Encoder/recorder sink abstraction and the in-memory recorder.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::encode::codec::{CodecChoice, preferences, select_codec};
use crate::foundation::core::{Canvas, Fps, FrameRGBA};
use crate::foundation::error::{StitchError, StitchResult};
use crate::model::ContainerFormat;

/// Stream parameters fixed when a stitch begins.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkConfig {
    pub canvas: Canvas,
    pub fps: Fps,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: ContainerFormat,
    /// Video bitrate in bits per second.
    pub video_bitrate: u32,
    /// Audio bitrate in bits per second.
    pub audio_bitrate: u32,
}

/// Where a finished artifact lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactRef {
    File(PathBuf),
    InMemory,
}

/// What a sink hands back once finalised.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkOutput {
    pub artifact: ArtifactRef,
    pub codec: CodecChoice,
}

/// Captures composited video and mixed audio as one combined stream.
///
/// Lifecycle: `begin`, any number of `push` calls interleaved with `pause`/`resume`, then exactly
/// one of `finish` or `abort`. Pushing while paused is an error: a paused sink must not record
/// stalled or duplicated frames.
pub trait StitchSink {
    /// Select the output codec and open the stream. Fails with `EncodingUnsupported` when no
    /// acceptable codec exists.
    fn begin(&mut self, cfg: &SinkConfig) -> StitchResult<CodecChoice>;

    fn pause(&mut self);

    fn resume(&mut self);

    fn is_paused(&self) -> bool;

    /// Record one video frame together with the interleaved audio that covers it.
    fn push(&mut self, frame: &FrameRGBA, audio: &[f32]) -> StitchResult<()>;

    fn finish(&mut self) -> StitchResult<SinkOutput>;

    /// Discard everything recorded so far. Must be safe to call in any state.
    fn abort(&mut self);
}

#[derive(Clone, Debug, PartialEq)]
pub enum SinkEvent {
    Begin { width: u32, height: u32 },
    Pause,
    Resume,
    Frame { index: u64, audio_frames: usize },
    Finish,
    Abort,
}

/// Sink that keeps everything in memory, for tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    encoders: Option<BTreeSet<String>>,
    keep_frames: bool,
    cfg: Option<SinkConfig>,
    codec: Option<CodecChoice>,
    paused: bool,
    finished: bool,
    pub events: Vec<SinkEvent>,
    pub frames: Vec<FrameRGBA>,
    pub audio: Vec<f32>,
    pub frame_count: u64,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep every pushed frame in `frames`.
    pub fn keeping_frames(mut self) -> Self {
        self.keep_frames = true;
        self
    }

    /// Restrict the encoders the sink pretends to have.
    pub fn with_encoders<I, S>(mut self, encoders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.encoders = Some(encoders.into_iter().map(Into::into).collect());
        self
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl StitchSink for InMemorySink {
    fn begin(&mut self, cfg: &SinkConfig) -> StitchResult<CodecChoice> {
        cfg.canvas.validate()?;
        let codec = match &self.encoders {
            Some(available) => select_codec(cfg.format, available)?,
            None => {
                let (video, audio) = preferences(cfg.format).first().copied().ok_or_else(|| {
                    StitchError::encoding_unsupported("no encoder preferences for container")
                })?;
                CodecChoice {
                    container: cfg.format,
                    video_encoder: video,
                    audio_encoder: audio,
                }
            }
        };
        self.cfg = Some(cfg.clone());
        self.codec = Some(codec);
        self.paused = false;
        self.finished = false;
        self.events.push(SinkEvent::Begin {
            width: cfg.canvas.width,
            height: cfg.canvas.height,
        });
        Ok(codec)
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.events.push(SinkEvent::Pause);
        }
    }

    fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.events.push(SinkEvent::Resume);
        }
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn push(&mut self, frame: &FrameRGBA, audio: &[f32]) -> StitchResult<()> {
        let Some(cfg) = self.cfg.as_ref() else {
            return Err(StitchError::evaluation("sink received a frame before begin"));
        };
        if self.paused {
            return Err(StitchError::evaluation("sink received a frame while paused"));
        }
        if frame.width != cfg.canvas.width || frame.height != cfg.canvas.height {
            return Err(StitchError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.canvas.width, cfg.canvas.height
            )));
        }
        let channels = usize::from(cfg.channels.max(1));
        self.events.push(SinkEvent::Frame {
            index: self.frame_count,
            audio_frames: audio.len() / channels,
        });
        self.frame_count += 1;
        self.audio.extend_from_slice(audio);
        if self.keep_frames {
            self.frames.push(frame.clone());
        }
        Ok(())
    }

    fn finish(&mut self) -> StitchResult<SinkOutput> {
        let codec = self
            .codec
            .ok_or_else(|| StitchError::evaluation("sink finished before begin"))?;
        self.finished = true;
        self.events.push(SinkEvent::Finish);
        Ok(SinkOutput {
            artifact: ArtifactRef::InMemory,
            codec,
        })
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.audio.clear();
        self.events.push(SinkEvent::Abort);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
