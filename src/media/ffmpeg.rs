//! Media provider backed by the system `ffprobe`/`ffmpeg` binaries.
//!
//! Every seek spawns one video and (when present) one audio decoder process. A pump thread per
//! process reads fixed-size chunks from its stdout into a bounded channel; awaiting a frame is a
//! `recv_timeout` on that channel, so a stalled decoder surfaces as an error instead of a hang.

use std::collections::VecDeque;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::foundation::error::{StitchError, StitchResult};
use crate::media::source::{
    AudioPcm, MIX_CHANNELS, MediaInfo, MediaProvider, MediaStream, OpenOptions, VideoFrame,
};
use crate::model::MediaRef;

const AUDIO_CHUNK_FRAMES: usize = 1024;

/// [`MediaProvider`] that shells out to `ffprobe` and `ffmpeg`.
#[derive(Clone, Debug)]
pub struct FfmpegProvider {
    load_timeout: Duration,
    queue_frames: usize,
}

impl Default for FfmpegProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegProvider {
    /// Create a provider; `REELSTITCH_LOAD_TIMEOUT_MS` and `REELSTITCH_DECODE_QUEUE_FRAMES`
    /// override the defaults.
    pub fn new() -> Self {
        let load_timeout_ms = std::env::var("REELSTITCH_LOAD_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(30_000);
        let queue_frames = std::env::var("REELSTITCH_DECODE_QUEUE_FRAMES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(8);
        Self {
            load_timeout: Duration::from_millis(load_timeout_ms),
            queue_frames,
        }
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }
}

impl MediaProvider for FfmpegProvider {
    fn open(&self, media: &MediaRef, opts: &OpenOptions) -> StitchResult<Box<dyn MediaStream>> {
        let info = probe_media(media)?;
        Ok(Box::new(FfmpegStream {
            media: media.clone(),
            info,
            opts: *opts,
            timeout: self.load_timeout,
            queue_frames: self.queue_frames,
            video: None,
            audio: None,
            pending_frame: None,
            audio_buf: VecDeque::new(),
            audio_done: true,
        }))
    }

    fn decode_audio(&self, media: &MediaRef, sample_rate: u32) -> StitchResult<AudioPcm> {
        decode_audio_f32_stereo(media, sample_rate)
    }
}

/// Probe duration, dimensions and audio presence through `ffprobe`.
pub fn probe_media(media: &MediaRef) -> StitchResult<MediaInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(media.as_str())
        .output()
        .map_err(|e| StitchError::evaluation(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(StitchError::evaluation(format!(
            "ffprobe failed for '{media}': {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| StitchError::evaluation(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| StitchError::evaluation("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| StitchError::evaluation("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| StitchError::evaluation("missing video height from ffprobe"))?;
    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video_stream.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| StitchError::evaluation("media duration is unknown"))?;
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        duration_secs,
        width,
        height,
        has_audio,
    })
}

/// Decode audio from a media source to stereo interleaved `f32` PCM.
pub fn decode_audio_f32_stereo(media: &MediaRef, sample_rate: u32) -> StitchResult<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-nostdin", "-i"])
        .arg(media.as_str())
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| StitchError::evaluation(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // A source without audio is reported as an error by ffmpeg; treat it as empty PCM.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: MIX_CHANNELS,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(StitchError::evaluation(format!(
            "ffmpeg audio decode failed for '{media}': {}",
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(StitchError::evaluation(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    Ok(AudioPcm {
        sample_rate,
        channels: MIX_CHANNELS,
        interleaved_f32: f32le_to_vec(&out.stdout),
    })
}

struct FfmpegStream {
    media: MediaRef,
    info: MediaInfo,
    opts: OpenOptions,
    timeout: Duration,
    queue_frames: usize,

    video: Option<DecodePump>,
    audio: Option<DecodePump>,
    pending_frame: Option<VideoFrame>,
    audio_buf: VecDeque<f32>,
    audio_done: bool,
}

impl FfmpegStream {
    fn frame_bytes(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 4
    }

    fn decoder_command(&self, at_secs: f64) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-nostdin", "-ss", &format!("{at_secs:.6}"), "-i"])
            .arg(self.media.as_str());
        cmd
    }

    fn frame_from_bytes(&self, bytes: Vec<u8>) -> VideoFrame {
        VideoFrame {
            width: self.info.width,
            height: self.info.height,
            rgba: Arc::new(bytes),
        }
    }
}

impl MediaStream for FfmpegStream {
    fn info(&self) -> &MediaInfo {
        &self.info
    }

    fn seek(&mut self, at_secs: f64) -> StitchResult<()> {
        if !at_secs.is_finite() || at_secs < 0.0 || at_secs >= self.info.duration_secs {
            return Err(StitchError::evaluation(format!(
                "seek target {at_secs}s is outside the media duration ({}s)",
                self.info.duration_secs
            )));
        }
        self.stop();

        let fps = self.opts.fps;
        let mut vcmd = self.decoder_command(at_secs);
        vcmd.args([
            "-an",
            "-vf",
            &format!("fps={}/{}", fps.num, fps.den),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ]);
        let mut video = DecodePump::spawn(vcmd, self.frame_bytes(), self.queue_frames)?;

        let first = match video.recv(self.timeout) {
            Ok(Some(bytes)) if bytes.len() == self.frame_bytes() => bytes,
            Ok(_) => {
                let stderr = video.finish_stderr();
                return Err(StitchError::evaluation(format!(
                    "no frame decoded at {at_secs:.3}s: {stderr}"
                )));
            }
            Err(e) => return Err(e),
        };
        self.pending_frame = Some(self.frame_from_bytes(first));
        self.video = Some(video);

        if self.info.has_audio {
            let mut acmd = self.decoder_command(at_secs);
            acmd.args([
                "-vn",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ac",
                "2",
                "-ar",
                &self.opts.sample_rate.to_string(),
                "pipe:1",
            ]);
            let chunk = AUDIO_CHUNK_FRAMES * usize::from(MIX_CHANNELS) * 4;
            self.audio = Some(DecodePump::spawn(acmd, chunk, self.queue_frames)?);
            self.audio_done = false;
        }
        Ok(())
    }

    fn next_frame(&mut self) -> StitchResult<Option<VideoFrame>> {
        if let Some(frame) = self.pending_frame.take() {
            return Ok(Some(frame));
        }
        let Some(video) = self.video.as_mut() else {
            return Ok(None);
        };
        match video.recv(self.timeout)? {
            Some(bytes) if bytes.len() == self.frame_bytes() => Ok(Some(self.frame_from_bytes(bytes))),
            // A short trailing chunk is a truncated frame; treat it as end of stream.
            _ => Ok(None),
        }
    }

    fn read_audio(&mut self, frames: usize, out: &mut Vec<f32>) -> StitchResult<()> {
        let need = frames * usize::from(MIX_CHANNELS);
        while self.audio_buf.len() < need && !self.audio_done {
            let Some(audio) = self.audio.as_mut() else {
                self.audio_done = true;
                break;
            };
            match audio.recv(self.timeout)? {
                Some(bytes) => self.audio_buf.extend(f32le_to_vec(&bytes)),
                None => self.audio_done = true,
            }
        }

        let take = need.min(self.audio_buf.len());
        out.extend(self.audio_buf.drain(..take));
        out.extend(std::iter::repeat_n(0.0f32, need - take));
        Ok(())
    }

    fn stop(&mut self) {
        self.video = None;
        self.audio = None;
        self.pending_frame = None;
        self.audio_buf.clear();
        self.audio_done = true;
    }
}

/// One decoder process plus the thread pumping its stdout into a bounded channel.
struct DecodePump {
    rx: Option<Receiver<Vec<u8>>>,
    child: Child,
    pump: Option<JoinHandle<()>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl DecodePump {
    fn spawn(mut cmd: Command, chunk_bytes: usize, queue: usize) -> StitchResult<Self> {
        if chunk_bytes == 0 {
            return Err(StitchError::evaluation("decoder chunk size is zero"));
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| {
            StitchError::evaluation(format!(
                "failed to spawn ffmpeg decoder (is it installed and on PATH?): {e}"
            ))
        })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| StitchError::evaluation("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| StitchError::evaluation("failed to open ffmpeg stderr (unexpected)"))?;

        let (tx, rx) = crossbeam_channel::bounded::<Vec<u8>>(queue);
        let pump = std::thread::spawn(move || {
            loop {
                let mut buf = vec![0u8; chunk_bytes];
                let n = match read_full(&mut stdout, &mut buf) {
                    Ok(n) => n,
                    Err(_) => break,
                };
                if n == 0 {
                    break;
                }
                buf.truncate(n);
                let short = n < chunk_bytes;
                if tx.send(buf).is_err() || short {
                    break;
                }
            }
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        Ok(Self {
            rx: Some(rx),
            child,
            pump: Some(pump),
            stderr_drain: Some(stderr_drain),
        })
    }

    /// Wait for the next chunk; `None` once the decoder finished.
    fn recv(&mut self, timeout: Duration) -> StitchResult<Option<Vec<u8>>> {
        let Some(rx) = self.rx.as_ref() else {
            return Ok(None);
        };
        match rx.recv_timeout(timeout) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Err(StitchError::evaluation(format!(
                "ffmpeg decoder produced no data within {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Wait for the process to exit and return its trimmed stderr.
    fn finish_stderr(&mut self) -> String {
        self.rx = None;
        let _ = self.child.wait();
        let bytes = self
            .stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .and_then(Result::ok)
            .unwrap_or_default();
        let msg = String::from_utf8_lossy(&bytes).trim().to_string();
        if msg.is_empty() {
            "decoder produced no output".to_string()
        } else {
            msg
        }
    }
}

impl Drop for DecodePump {
    fn drop(&mut self) {
        // Dropping the receiver first unblocks a pump stuck on a full channel.
        drop(self.rx.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
        if let Some(drain) = self.stderr_drain.take() {
            let _ = drain.join();
        }
    }
}

/// Fill `buf` as far as the reader allows; returns bytes read (short only at EOF).
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn f32le_to_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Return `true` when both `ffmpeg` and `ffprobe` can be invoked from `PATH`.
pub fn ffmpeg_tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/media/ffmpeg.rs"]
mod tests;
