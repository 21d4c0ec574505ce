use crate::foundation::core::Fps;
use crate::foundation::error::{StitchError, StitchResult};
use crate::media::source::{AudioPcm, MIX_CHANNELS};
use crate::session::pool::Slot;

/// Convert a frame delta to the nearest sample index at `sample_rate`.
pub fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

/// Add `src * gain` into `out` sample by sample.
pub fn mix_into(out: &mut [f32], src: &[f32], gain: f32) {
    if gain == 0.0 {
        return;
    }
    for (o, s) in out.iter_mut().zip(src) {
        *o += s * gain;
    }
}

/// Looping background track at a fixed gain.
struct MusicTrack {
    pcm: Vec<f32>,
    volume: f32,
    cursor_frame: usize,
    playing: bool,
}

impl MusicTrack {
    fn frames(&self) -> usize {
        self.pcm.len() / usize::from(MIX_CHANNELS)
    }

    fn mix(&mut self, out: &mut [f32]) {
        let total = self.frames();
        if !self.playing || total == 0 || self.volume == 0.0 {
            return;
        }
        let ch = usize::from(MIX_CHANNELS);
        for frame in out.chunks_exact_mut(ch) {
            let src = &self.pcm[self.cursor_frame * ch..self.cursor_frame * ch + ch];
            for (o, s) in frame.iter_mut().zip(src) {
                *o += s * self.volume;
            }
            self.cursor_frame = (self.cursor_frame + 1) % total;
        }
    }
}

/// Audio Mixer Graph: both slot taps plus optional looping music summed into one destination.
///
/// Audio is produced in lockstep with video. Output frame `k` owns the samples
/// `[frame_to_sample(k), frame_to_sample(k + 1))`, so chunk lengths vary by at most one sample
/// and never drift from the video clock. Slot gains are sampled once per tick.
pub struct AudioMixer {
    fps: Fps,
    sample_rate: u32,
    music: Option<MusicTrack>,
    ticks: u64,
    slot_buf: Vec<f32>,
}

impl AudioMixer {
    pub fn new(fps: Fps, sample_rate: u32) -> StitchResult<Self> {
        if sample_rate == 0 {
            return Err(StitchError::mix_graph("mix sample rate must be > 0"));
        }
        Ok(Self {
            fps,
            sample_rate,
            music: None,
            ticks: 0,
            slot_buf: Vec::new(),
        })
    }

    /// Route a decoded background track at a fixed `volume` in `[0, 1]`.
    pub fn set_music(&mut self, pcm: AudioPcm, volume: f64) -> StitchResult<()> {
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            return Err(StitchError::mix_graph(format!(
                "background music volume must be within [0, 1], got {volume}"
            )));
        }
        if pcm.channels != MIX_CHANNELS {
            return Err(StitchError::mix_graph(format!(
                "background music must be decoded to {MIX_CHANNELS} channels, got {}",
                pcm.channels
            )));
        }
        if pcm.sample_rate != self.sample_rate {
            return Err(StitchError::mix_graph(format!(
                "background music sample rate {} does not match the mix rate {}",
                pcm.sample_rate, self.sample_rate
            )));
        }
        let frames = pcm.frames();
        if frames == 0 {
            tracing::warn!("background music decoded to no samples; mixing silence");
        }

        let mut interleaved = pcm.interleaved_f32;
        interleaved.truncate(frames * usize::from(MIX_CHANNELS));
        self.music = Some(MusicTrack {
            pcm: interleaved,
            volume: volume as f32,
            cursor_frame: 0,
            playing: false,
        });
        Ok(())
    }

    pub fn has_music(&self) -> bool {
        self.music.is_some()
    }

    pub fn start_music(&mut self) {
        if let Some(m) = self.music.as_mut() {
            m.playing = true;
            tracing::debug!(volume = m.volume, "background music started");
        }
    }

    pub fn stop_music(&mut self) {
        if let Some(m) = self.music.as_mut()
            && m.playing
        {
            m.playing = false;
            tracing::debug!("background music stopped");
        }
    }

    /// Stereo frames owned by the next output tick.
    pub fn next_tick_frames(&self) -> usize {
        let s0 = frame_to_sample(self.ticks, self.fps, self.sample_rate);
        let s1 = frame_to_sample(self.ticks + 1, self.fps, self.sample_rate);
        (s1 - s0) as usize
    }

    /// Mix one output tick: each slot's audio at its current volume, plus music.
    pub fn mix_tick(&mut self, slots: &mut [&mut Slot]) -> StitchResult<Vec<f32>> {
        let frames = self.next_tick_frames();
        let mut out = vec![0.0f32; frames * usize::from(MIX_CHANNELS)];

        for slot in slots.iter_mut() {
            self.slot_buf.clear();
            slot.pull_audio(frames, &mut self.slot_buf)?;
            mix_into(&mut out, &self.slot_buf, slot.volume() as f32);
        }
        if let Some(music) = self.music.as_mut() {
            music.mix(&mut out);
        }
        for s in &mut out {
            *s = s.clamp(-1.0, 1.0);
        }

        self.ticks += 1;
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mixer.rs"]
mod tests;
