#![forbid(unsafe_code)]
//! Stitching engine: turns an ordered list of generated clips into one continuous movie.
//!
//! A stitch runs a single frame pump over a precomputed step plan:
//!
//! 1. [`Timeline::from_clips`] filters completed clips and validates trims and transitions.
//! 2. [`plan_timeline`] places every solo and transition phase on the output frame grid.
//! 3. [`stitch`] drives a two-slot player pool, the compositor, the audio mixer and a sink in
//!    lockstep, pausing the sink around every clip load.
//!
//! Media comes from a [`MediaProvider`] ([`FfmpegProvider`] for real files,
//! [`SyntheticProvider`] for tests) and output goes to a [`StitchSink`] ([`FfmpegSink`] or
//! [`InMemorySink`]).

pub mod audio;
pub mod encode;
pub mod foundation;
pub mod media;
pub mod model;
pub mod render;
pub mod session;
pub mod timeline;

pub use audio::mixer::{AudioMixer, frame_to_sample};
pub use encode::codec::{CodecChoice, parse_encoders, select_codec};
pub use encode::ffmpeg::FfmpegSink;
pub use encode::sink::{ArtifactRef, InMemorySink, SinkConfig, SinkEvent, SinkOutput, StitchSink};
pub use foundation::cancel::CancelToken;
pub use foundation::core::{Canvas, Fps, FrameRGBA};
pub use foundation::error::{StitchError, StitchResult};
pub use media::ffmpeg::{FfmpegProvider, ffmpeg_tools_available};
pub use media::source::{
    AudioPcm, MIX_CHANNELS, MIX_SAMPLE_RATE, MediaInfo, MediaProvider, MediaStream, OpenOptions,
    VideoFrame,
};
pub use media::synthetic::{SyntheticMedia, SyntheticProvider};
pub use model::{
    AspectRatio, BackgroundMusic, Clip, ClipStatus, ContainerFormat, MediaRef, ResolutionTier,
    StitchOptions, StitchProject, TransitionKind, TransitionSpec,
};
pub use render::transition::{crossfade_gains, progress, wipe_reveal_rect};
pub use session::progress::{Progress, ProgressReporter};
pub use session::stitcher::{Artifact, StitchStats, render_still, stitch};
pub use timeline::Timeline;
pub use timeline::plan::{StitchPlan, Step, plan_timeline};
