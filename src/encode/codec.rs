//! Output codec selection from an ordered preference list.

use std::collections::BTreeSet;
use std::process::{Command, Stdio};

use crate::foundation::error::{StitchError, StitchResult};
use crate::model::ContainerFormat;

/// A container plus the video/audio encoders that will fill it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodecChoice {
    pub container: ContainerFormat,
    pub video_encoder: &'static str,
    pub audio_encoder: &'static str,
}

impl std::fmt::Display for CodecChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} + {})",
            self.container.extension(),
            self.video_encoder,
            self.audio_encoder
        )
    }
}

const MP4_PREFS: &[(&str, &str)] = &[
    ("libx264", "aac"),
    ("h264_videotoolbox", "aac"),
    ("libopenh264", "aac"),
    ("mpeg4", "aac"),
];

const WEBM_PREFS: &[(&str, &str)] = &[("libvpx-vp9", "libopus"), ("libvpx", "libvorbis")];

/// `(video, audio)` encoder pairs for `format`, best first.
pub fn preferences(format: ContainerFormat) -> &'static [(&'static str, &'static str)] {
    match format {
        ContainerFormat::Mp4 => MP4_PREFS,
        ContainerFormat::Webm => WEBM_PREFS,
    }
}

/// Pick the first pair whose encoders are both available.
///
/// The requested container is tried first and the other container is the fallback.
pub fn select_codec(
    requested: ContainerFormat,
    available: &BTreeSet<String>,
) -> StitchResult<CodecChoice> {
    let fallback = match requested {
        ContainerFormat::Mp4 => ContainerFormat::Webm,
        ContainerFormat::Webm => ContainerFormat::Mp4,
    };
    for container in [requested, fallback] {
        for &(video, audio) in preferences(container) {
            if available.contains(video) && available.contains(audio) {
                if container != requested {
                    tracing::warn!(
                        requested = requested.extension(),
                        selected = container.extension(),
                        "requested container has no usable encoders; falling back"
                    );
                }
                return Ok(CodecChoice {
                    container,
                    video_encoder: video,
                    audio_encoder: audio,
                });
            }
        }
    }
    Err(StitchError::encoding_unsupported(format!(
        "no acceptable {} or {} encoder pair is available on this host",
        requested.extension(),
        fallback.extension()
    )))
}

/// Encoder names from `ffmpeg -hide_banner -encoders` output.
///
/// Listing rows look like ` V....D libx264   libx264 H.264 ...`; the legend above the `------`
/// separator is skipped.
pub fn parse_encoders(listing: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut in_table = false;
    for line in listing.lines() {
        let trimmed = line.trim();
        if !in_table {
            in_table = trimmed.starts_with("---");
            continue;
        }
        let mut cols = trimmed.split_whitespace();
        let (Some(flags), Some(name)) = (cols.next(), cols.next()) else {
            continue;
        };
        if flags.len() == 6 && matches!(flags.as_bytes()[0], b'V' | b'A' | b'S') {
            out.insert(name.to_string());
        }
    }
    out
}

/// Query the encoders compiled into the system `ffmpeg`.
pub fn probe_encoders() -> StitchResult<BTreeSet<String>> {
    let out = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            StitchError::encoding_unsupported(format!(
                "ffmpeg is required for encoding, but could not be run: {e}"
            ))
        })?;
    if !out.status.success() {
        return Err(StitchError::encoding_unsupported(format!(
            "ffmpeg -encoders exited with status {}",
            out.status
        )));
    }
    Ok(parse_encoders(&String::from_utf8_lossy(&out.stdout)))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/codec.rs"]
mod tests;
