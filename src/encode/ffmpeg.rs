//! Sink that encodes with the system `ffmpeg` binary.
//!
//! Video frames are flattened to opaque RGBA and streamed to an encoder process writing a
//! video-only part file; mixed PCM is spooled to a raw `f32le` part file. `finish` muxes both into
//! the final artifact and removes the parts. Any exit other than a successful `finish` removes
//! every file the sink created.

use std::collections::BTreeSet;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::encode::codec::{CodecChoice, probe_encoders, select_codec};
use crate::encode::sink::{ArtifactRef, SinkConfig, SinkOutput, StitchSink};
use crate::foundation::core::FrameRGBA;
use crate::foundation::error::{StitchError, StitchResult};
use crate::foundation::math::mul_div255_u16;
use crate::model::ContainerFormat;

pub fn ensure_parent_dir(path: &Path) -> StitchResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Encoder and spool state that exists between `begin` and `finish`/`abort`.
struct Session {
    cfg: SinkConfig,
    codec: CodecChoice,
    out_path: PathBuf,
    video_part: PathBuf,
    audio_part: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    audio: BufWriter<std::fs::File>,
    scratch: Vec<u8>,
}

pub struct FfmpegSink {
    out_path: PathBuf,
    overwrite: bool,
    bg_rgba: [u8; 4],
    encoders: Option<BTreeSet<String>>,
    session: Option<Session>,
    paused: bool,
}

impl FfmpegSink {
    pub fn new(out_path: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite,
            bg_rgba: [0, 0, 0, 255],
            encoders: None,
            session: None,
            paused: false,
        }
    }

    /// Use a known encoder list instead of querying `ffmpeg -encoders`.
    pub fn with_encoders(mut self, encoders: BTreeSet<String>) -> Self {
        self.encoders = Some(encoders);
        self
    }

    fn output_path_for(&self, container: ContainerFormat) -> PathBuf {
        let ext = container.extension();
        let matches = self
            .out_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if matches {
            self.out_path.clone()
        } else {
            let p = self.out_path.with_extension(ext);
            tracing::warn!(path = %p.display(), "output extension adjusted to the selected container");
            p
        }
    }

    fn spawn_session(&self, cfg: &SinkConfig, codec: CodecChoice) -> StitchResult<Session> {
        let out_path = self.output_path_for(codec.container);
        ensure_parent_dir(&out_path)?;
        if !self.overwrite && out_path.exists() {
            return Err(StitchError::validation(format!(
                "output file '{}' already exists",
                out_path.display()
            )));
        }

        let video_part = part_path(&out_path, "video.part");
        let audio_part = part_path(&out_path, "audio.f32le.part");

        // Created before the encoder spawns; nothing needs reaping if this fails.
        let audio_file = {
            use anyhow::Context as _;
            std::fs::File::create(&audio_part)
                .with_context(|| format!("create audio spool '{}'", audio_part.display()))?
        };

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.canvas.width, cfg.canvas.height),
            "-framerate",
            &format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            codec.video_encoder,
            "-b:v",
            &cfg.video_bitrate.to_string(),
            "-pix_fmt",
            "yuv420p",
            "-f",
            codec.container.muxer(),
        ])
        .arg(&video_part);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                drop(audio_file);
                let _ = std::fs::remove_file(&audio_part);
                return Err(StitchError::evaluation(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                )));
            }
        };
        let (Some(stdin), Some(mut stderr)) = (child.stdin.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            drop(audio_file);
            for p in [&video_part, &audio_part] {
                let _ = std::fs::remove_file(p);
            }
            return Err(StitchError::evaluation(
                "failed to open ffmpeg stdio pipes (unexpected)",
            ));
        };
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Session {
            cfg: cfg.clone(),
            codec,
            out_path,
            video_part,
            audio_part,
            child,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            audio: BufWriter::new(audio_file),
            scratch: vec![0u8; cfg.canvas.byte_len()],
        })
    }
}

impl StitchSink for FfmpegSink {
    #[tracing::instrument(skip(self, cfg), fields(out = %self.out_path.display()))]
    fn begin(&mut self, cfg: &SinkConfig) -> StitchResult<CodecChoice> {
        cfg.canvas.validate()?;
        if self.session.is_some() {
            return Err(StitchError::evaluation("ffmpeg sink already begun"));
        }
        let available = match &self.encoders {
            Some(e) => e.clone(),
            None => probe_encoders()?,
        };
        let codec = select_codec(cfg.format, &available)?;
        tracing::info!(%codec, "encoder selected");

        self.session = Some(self.spawn_session(cfg, codec)?);
        self.paused = false;
        Ok(codec)
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn push(&mut self, frame: &FrameRGBA, audio: &[f32]) -> StitchResult<()> {
        if self.paused {
            return Err(StitchError::evaluation("sink received a frame while paused"));
        }
        let Some(s) = self.session.as_mut() else {
            return Err(StitchError::evaluation("ffmpeg sink is not running"));
        };
        if frame.width != s.cfg.canvas.width || frame.height != s.cfg.canvas.height {
            return Err(StitchError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, s.cfg.canvas.width, s.cfg.canvas.height
            )));
        }
        if frame.data.len() != s.scratch.len() {
            return Err(StitchError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_to_opaque_rgba8(&mut s.scratch, &frame.data, frame.premultiplied, self.bg_rgba)?;
        let Some(stdin) = s.stdin.as_mut() else {
            return Err(StitchError::evaluation("ffmpeg encoder is already finalized"));
        };
        stdin.write_all(&s.scratch).map_err(|e| {
            StitchError::evaluation(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        for &sample in audio {
            s.audio.write_all(&sample.to_le_bytes()).map_err(|e| {
                StitchError::evaluation(format!("failed to spool mixed audio: {e}"))
            })?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn finish(&mut self) -> StitchResult<SinkOutput> {
        let Some(mut s) = self.session.take() else {
            return Err(StitchError::evaluation("ffmpeg sink is not running"));
        };
        let result = finalize(&mut s);
        if result.is_err() {
            cleanup_session(&mut s, true);
        }
        result
    }

    fn abort(&mut self) {
        if let Some(mut s) = self.session.take() {
            tracing::debug!(out = %s.out_path.display(), "aborting ffmpeg sink");
            cleanup_session(&mut s, true);
        }
        self.paused = false;
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.abort();
    }
}

fn finalize(s: &mut Session) -> StitchResult<SinkOutput> {
    drop(s.stdin.take());
    let status = s
        .child
        .wait()
        .map_err(|e| StitchError::evaluation(format!("failed to wait for ffmpeg to finish: {e}")))?;
    let stderr = take_stderr(s);
    if !status.success() {
        return Err(StitchError::evaluation(format!(
            "ffmpeg exited with status {status}: {stderr}"
        )));
    }
    s.audio
        .flush()
        .map_err(|e| StitchError::evaluation(format!("failed to flush audio spool: {e}")))?;

    let mut cmd = Command::new("ffmpeg");
    cmd.stdin(Stdio::null());
    cmd.args(["-y", "-loglevel", "error", "-i"])
        .arg(&s.video_part)
        .args([
            "-f",
            "f32le",
            "-ar",
            &s.cfg.sample_rate.to_string(),
            "-ac",
            &s.cfg.channels.to_string(),
            "-i",
        ])
        .arg(&s.audio_part)
        .args([
            "-map",
            "0:v:0",
            "-map",
            "1:a:0",
            "-c:v",
            "copy",
            "-c:a",
            s.codec.audio_encoder,
            "-b:a",
            &s.cfg.audio_bitrate.to_string(),
        ]);
    if s.codec.container == ContainerFormat::Mp4 {
        cmd.args(["-movflags", "+faststart"]);
    }
    cmd.args(["-f", s.codec.container.muxer()]).arg(&s.out_path);

    let out = cmd
        .output()
        .map_err(|e| StitchError::evaluation(format!("failed to run ffmpeg mux pass: {e}")))?;
    if !out.status.success() {
        return Err(StitchError::evaluation(format!(
            "ffmpeg mux exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    cleanup_session(s, false);
    tracing::info!(out = %s.out_path.display(), codec = %s.codec, "artifact finalized");
    Ok(SinkOutput {
        artifact: ArtifactRef::File(s.out_path.clone()),
        codec: s.codec,
    })
}

fn take_stderr(s: &mut Session) -> String {
    s.stderr_drain
        .take()
        .and_then(|h| h.join().ok())
        .and_then(Result::ok)
        .map(|b| String::from_utf8_lossy(&b).trim().to_string())
        .unwrap_or_default()
}

/// Stop the encoder and remove part files; `remove_output` also deletes the final artifact.
fn cleanup_session(s: &mut Session, remove_output: bool) {
    drop(s.stdin.take());
    let _ = s.child.kill();
    let _ = s.child.wait();
    let _ = take_stderr(s);
    for p in [&s.video_part, &s.audio_part] {
        let _ = std::fs::remove_file(p);
    }
    if remove_output {
        let _ = std::fs::remove_file(&s.out_path);
    }
}

fn part_path(out: &Path, suffix: &str) -> PathBuf {
    let mut name = out
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{suffix}"));
    out.with_file_name(name)
}

fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> StitchResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(StitchError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let fg = if src_is_premul {
                u16::from(s[c])
            } else {
                mul_div255_u16(u16::from(s[c]), a)
            };
            d[c] = (fg + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
