use std::path::{Path, PathBuf};

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{StitchError, StitchResult};
use crate::foundation::math::round_even;

/// Opaque reference to a playable media resource (file path or URL understood by the provider).
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MediaRef(pub String);

impl MediaRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for `scheme://...` references, which are never path-resolved.
    pub fn is_url(&self) -> bool {
        self.0
            .split_once("://")
            .is_some_and(|(scheme, _)| {
                !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric())
            })
    }

    /// Resolve a relative file reference against `base_dir`.
    pub fn resolve_against(&self, base_dir: &Path) -> Self {
        if self.is_url() || (self.0.contains(':') && !self.0.contains(std::path::MAIN_SEPARATOR)) {
            return self.clone();
        }
        let p = Path::new(&self.0);
        if p.is_absolute() {
            return self.clone();
        }
        Self(base_dir.join(p).to_string_lossy().into_owned())
    }
}

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upstream generation status of a clip. Only `completed` clips reach the timeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipStatus {
    Pending,
    Generating,
    #[default]
    Completed,
    Failed,
}

/// Visual/audio treatment joining a clip to the next one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum TransitionKind {
    /// Hard cut.
    #[default]
    None,
    Fade,
    WipeLeft,
    WipeRight,
    SlideLeft,
    SlideRight,
}

impl TransitionKind {
    /// Parse a transition kind. Unrecognized names fall back to a hard cut.
    pub fn parse(s: &str) -> Self {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "fade" | "crossfade" | "dissolve" => Self::Fade,
            "wipeleft" => Self::WipeLeft,
            "wiperight" => Self::WipeRight,
            "slideleft" => Self::SlideLeft,
            "slideright" => Self::SlideRight,
            _ => Self::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fade => "fade",
            Self::WipeLeft => "wipeLeft",
            Self::WipeRight => "wipeRight",
            Self::SlideLeft => "slideLeft",
            Self::SlideRight => "slideRight",
        }
    }
}

impl From<String> for TransitionKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<TransitionKind> for &'static str {
    fn from(k: TransitionKind) -> Self {
        k.as_str()
    }
}

/// Transition from the owning clip into the next one.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionSpec {
    #[serde(default)]
    pub kind: TransitionKind,
    /// Duration in seconds.
    pub duration: f64,
}

impl TransitionSpec {
    pub fn new(kind: TransitionKind, duration: f64) -> Self {
        Self { kind, duration }
    }
}

/// One generated scene: playable media plus trim, caption and outgoing transition.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,
    pub media: MediaRef,
    /// Declared native duration in seconds.
    pub duration: f64,
    #[serde(default)]
    pub trim_start: f64,
    #[serde(default)]
    pub trim_end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_into_next: Option<TransitionSpec>,
    #[serde(default)]
    pub status: ClipStatus,
}

impl Clip {
    pub fn new(id: impl Into<String>, media: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            media: MediaRef::new(media),
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            caption: None,
            transition_into_next: None,
            status: ClipStatus::Completed,
        }
    }

    pub fn with_trim(mut self, trim_start: f64, trim_end: f64) -> Self {
        self.trim_start = trim_start;
        self.trim_end = trim_end;
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_transition(mut self, kind: TransitionKind, duration: f64) -> Self {
        self.transition_into_next = Some(TransitionSpec::new(kind, duration));
        self
    }

    pub fn with_status(mut self, status: ClipStatus) -> Self {
        self.status = status;
        self
    }

    /// Caption text when present and non-blank.
    pub fn caption_text(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Looping background track mixed under the whole movie.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BackgroundMusic {
    pub media: MediaRef,
    /// Fixed gain in `[0, 1]`.
    #[serde(default = "default_music_volume")]
    pub volume: f64,
}

fn default_music_volume() -> f64 {
    0.3
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionTier {
    #[default]
    Low,
    High,
}

impl ResolutionTier {
    /// Short edge of the output canvas in pixels.
    pub fn short_edge(self) -> u32 {
        match self {
            Self::Low => 720,
            Self::High => 1080,
        }
    }

    /// Video bitrate in bits per second.
    pub fn video_bitrate(self) -> u32 {
        match self {
            Self::Low => 5_000_000,
            Self::High => 10_000_000,
        }
    }

    pub fn caption_font_px(self) -> f32 {
        match self {
            Self::Low => 40.0,
            Self::High => 60.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Classic,
}

impl AspectRatio {
    /// `(width, height)` ratio terms.
    pub fn terms(self) -> (u32, u32) {
        match self {
            Self::Landscape => (16, 9),
            Self::Portrait => (9, 16),
            Self::Square => (1, 1),
            Self::Classic => (4, 3),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    #[default]
    Mp4,
    Webm,
}

impl ContainerFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }

    /// Name understood by `ffmpeg -f`.
    pub fn muxer(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }
}

/// Per-stitch request options supplied by the workflow layer.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StitchOptions {
    pub resolution: ResolutionTier,
    pub aspect_ratio: AspectRatio,
    pub format: ContainerFormat,
    pub fps: Fps,
    /// Explicit output size; overrides tier/aspect sizing.
    pub canvas: Option<Canvas>,
    pub music: Option<BackgroundMusic>,
    /// Font file used for burned-in captions.
    pub caption_font: Option<PathBuf>,
}

impl StitchOptions {
    pub fn output_canvas(&self) -> Canvas {
        if let Some(c) = self.canvas {
            return c;
        }
        let short = f64::from(self.resolution.short_edge());
        let (w, h) = self.aspect_ratio.terms();
        let (w, h) = (f64::from(w), f64::from(h));
        if w >= h {
            Canvas {
                width: round_even(short * w / h),
                height: round_even(short),
            }
        } else {
            Canvas {
                width: round_even(short),
                height: round_even(short * h / w),
            }
        }
    }

    /// Caption font size for the output canvas.
    pub fn caption_font_px(&self) -> f32 {
        let tier_px = self.resolution.caption_font_px();
        match self.canvas {
            None => tier_px,
            Some(c) => {
                let scale = c.short_edge() as f32 / self.resolution.short_edge() as f32;
                (tier_px * scale).max(8.0)
            }
        }
    }

    pub fn validate(&self) -> StitchResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        self.output_canvas().validate()?;
        if let Some(music) = &self.music
            && (!music.volume.is_finite() || !(0.0..=1.0).contains(&music.volume))
        {
            return Err(StitchError::mix_graph(format!(
                "background music volume must be within [0, 1], got {}",
                music.volume
            )));
        }
        Ok(())
    }
}

/// A stitch request as stored by the workflow layer: clips plus options.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StitchProject {
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub options: StitchOptions,
}

impl StitchProject {
    /// Load a project JSON file; relative media references resolve against its directory.
    pub fn from_path(path: &Path) -> StitchResult<Self> {
        use anyhow::Context as _;

        let f = std::fs::File::open(path)
            .with_context(|| format!("open project '{}'", path.display()))?;
        let mut project: StitchProject = serde_json::from_reader(std::io::BufReader::new(f))
            .with_context(|| format!("parse project JSON '{}'", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for clip in &mut project.clips {
            clip.media = clip.media.resolve_against(base);
        }
        if let Some(music) = project.options.music.as_mut() {
            music.media = music.media.resolve_against(base);
        }
        if let Some(font) = project.options.caption_font.as_mut()
            && font.is_relative()
        {
            *font = base.join(&*font);
        }
        Ok(project)
    }
}

#[cfg(test)]
#[path = "../tests/unit/model.rs"]
mod tests;
