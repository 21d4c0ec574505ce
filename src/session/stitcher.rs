//! The stitch scheduler: one frame pump driving the slot pool, compositor, mixer and sink in
//! lockstep.
//!
//! Everything is validated before anything is allocated. Once resources exist, every exit path
//! (success, error, cancellation) runs through the same cleanup: the sink is finished or aborted,
//! both slots are released and the music is stopped.

use std::time::Instant;

use crate::audio::mixer::AudioMixer;
use crate::encode::codec::CodecChoice;
use crate::encode::sink::{ArtifactRef, SinkConfig, StitchSink};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::FrameRGBA;
use crate::foundation::error::{StitchError, StitchResult};
use crate::media::loader::ClipLoader;
use crate::media::source::{MIX_CHANNELS, MIX_SAMPLE_RATE, MediaProvider, OpenOptions};
use crate::model::{Clip, StitchOptions, TransitionKind};
use crate::render::caption::CaptionRenderer;
use crate::render::compositor::Compositor;
use crate::render::transition::{crossfade_gains, progress};
use crate::session::pool::{ClipPhase, SlotPool};
use crate::session::progress::{Progress, ProgressReporter};
use crate::timeline::Timeline;
use crate::timeline::plan::{StitchPlan, Step, plan_timeline};

/// Audio bitrate for every tier, bits per second.
pub const AUDIO_BITRATE: u32 = 192_000;

#[derive(Clone, Debug, PartialEq)]
pub struct StitchStats {
    pub clips: usize,
    pub total_frames: u64,
    /// Frames in which two clips were visible and audible together.
    pub transition_frames: u64,
    pub duration_secs: f64,
}

/// The finished movie.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    pub location: ArtifactRef,
    pub codec: CodecChoice,
    pub stats: StitchStats,
}

/// Everything derived from the request before any resource is allocated.
struct Prepared {
    timeline: Timeline,
    plan: StitchPlan,
}

fn prepare(clips: &[Clip], opts: &StitchOptions) -> StitchResult<Prepared> {
    let timeline = Timeline::from_clips(clips)?;
    opts.validate()?;
    if timeline.has_captions() && opts.caption_font.is_none() {
        return Err(StitchError::validation(
            "clips carry captions but no caption font is configured",
        ));
    }
    let plan = plan_timeline(&timeline, opts.fps);
    if plan.total_frames == 0 {
        return Err(StitchError::validation(
            "timeline is shorter than one output frame",
        ));
    }
    Ok(Prepared { timeline, plan })
}

fn build_compositor(timeline: &Timeline, opts: &StitchOptions) -> StitchResult<Compositor> {
    let canvas = opts.output_canvas();
    let captions = match (&opts.caption_font, timeline.has_captions()) {
        (Some(font), true) => {
            let mut r = CaptionRenderer::from_font_file(font, opts.caption_font_px(), canvas)?;
            for (i, clip) in timeline.clips().iter().enumerate() {
                if let Some(text) = clip.caption_text() {
                    r.prepare(i, text)?;
                }
            }
            Some(r)
        }
        _ => None,
    };
    Compositor::new(canvas, captions)
}

fn build_mixer(opts: &StitchOptions, provider: &dyn MediaProvider) -> StitchResult<AudioMixer> {
    let mut mixer = AudioMixer::new(opts.fps, MIX_SAMPLE_RATE)?;
    if let Some(music) = &opts.music {
        let pcm = provider
            .decode_audio(&music.media, MIX_SAMPLE_RATE)
            .map_err(|e| {
                StitchError::mix_graph(format!(
                    "failed to decode background music '{}': {e}",
                    music.media
                ))
            })?;
        mixer.set_music(pcm, music.volume)?;
    }
    Ok(mixer)
}

/// Stitch `clips` into one movie written through `sink`.
///
/// Only clips whose status is `completed` participate. Progress is reported through `on_progress`
/// and ends at exactly 100 on success. On any failure nothing is returned and the sink is aborted.
#[tracing::instrument(skip_all, fields(clips = clips.len()))]
pub fn stitch(
    clips: &[Clip],
    opts: &StitchOptions,
    provider: &dyn MediaProvider,
    sink: &mut dyn StitchSink,
    on_progress: &mut dyn FnMut(&Progress),
    cancel: &CancelToken,
) -> StitchResult<Artifact> {
    let started = Instant::now();
    let Prepared { timeline, plan } = prepare(clips, opts)?;
    cancel.check()?;

    let canvas = opts.output_canvas();
    tracing::info!(
        clips = timeline.len(),
        frames = plan.total_frames,
        duration_secs = plan.duration_secs(),
        width = canvas.width,
        height = canvas.height,
        "stitch starting"
    );

    let compositor = build_compositor(&timeline, opts)?;
    let mixer = build_mixer(opts, provider)?;
    let sink_cfg = SinkConfig {
        canvas,
        fps: opts.fps,
        sample_rate: MIX_SAMPLE_RATE,
        channels: MIX_CHANNELS,
        format: opts.format,
        video_bitrate: opts.resolution.video_bitrate(),
        audio_bitrate: AUDIO_BITRATE,
    };
    match sink.begin(&sink_cfg) {
        Ok(codec) => tracing::debug!(%codec, "sink ready"),
        Err(e) => {
            sink.abort();
            return Err(e);
        }
    }

    let open_opts = OpenOptions {
        fps: opts.fps,
        sample_rate: MIX_SAMPLE_RATE,
    };
    let mut engine = Engine {
        timeline: &timeline,
        loader: ClipLoader::new(provider, open_opts, cancel),
        pool: SlotPool::new(),
        compositor,
        mixer,
        sink,
        progress: ProgressReporter::new(timeline.len(), on_progress),
        cancel,
        phases: vec![ClipPhase::Init; timeline.len()],
        frames_pushed: 0,
    };

    let run = engine.run(&plan);
    engine.mixer.stop_music();
    engine.pool.release();

    let finished = run.and_then(|()| {
        if engine.frames_pushed != plan.total_frames {
            return Err(StitchError::evaluation(format!(
                "rendered {} frames, planned {}",
                engine.frames_pushed, plan.total_frames
            )));
        }
        engine.cancel.check()?;
        engine.sink.finish()
    });
    let output = match finished {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!(error = %e, "stitch failed; discarding output");
            engine.sink.abort();
            return Err(e);
        }
    };

    engine.progress.finish("Export complete");
    let stats = StitchStats {
        clips: timeline.len(),
        total_frames: plan.total_frames,
        transition_frames: plan.transition_frames,
        duration_secs: plan.duration_secs(),
    };
    tracing::info!(
        frames = stats.total_frames,
        duration_secs = stats.duration_secs,
        elapsed_ms = started.elapsed().as_millis() as u64,
        codec = %output.codec,
        "stitch finished"
    );
    Ok(Artifact {
        location: output.artifact,
        codec: output.codec,
        stats,
    })
}

struct Engine<'a> {
    timeline: &'a Timeline,
    loader: ClipLoader<'a>,
    pool: SlotPool,
    compositor: Compositor,
    mixer: AudioMixer,
    sink: &'a mut dyn StitchSink,
    progress: ProgressReporter<'a>,
    cancel: &'a CancelToken,
    phases: Vec<ClipPhase>,
    frames_pushed: u64,
}

impl Engine<'_> {
    fn run(&mut self, plan: &StitchPlan) -> StitchResult<()> {
        self.mixer.start_music();
        for step in &plan.steps {
            self.cancel.check()?;
            match *step {
                Step::Load { clip, seek_to } => self.load(clip, seek_to)?,
                Step::Swap => self.swap()?,
                Step::Solo { clip, frames } => self.solo(clip, frames)?,
                Step::Transition {
                    outgoing,
                    incoming,
                    kind,
                    duration,
                    frames,
                } => self.transition(outgoing, incoming, kind, duration, frames, plan)?,
            }
        }
        self.mixer.stop_music();
        Ok(())
    }

    fn load(&mut self, clip: usize, seek_to: f64) -> StitchResult<()> {
        // Nothing may be recorded while the standby slot loads.
        self.sink.pause();
        let c = self.timeline.clip(clip);
        tracing::debug!(clip = %c.id, seek_to, "loading standby slot");
        self.loader.load(self.pool.standby_mut(), clip, c)?;
        self.loader.seek(self.pool.standby_mut(), seek_to)?;
        self.pool.standby_mut().set_volume(0.0);
        self.sink.resume();
        Ok(())
    }

    fn swap(&mut self) -> StitchResult<()> {
        if let Some(out) = self.pool.current().clip_index() {
            self.phases[out].advance(ClipPhase::Swap)?;
            self.phases[out].advance(ClipPhase::Done)?;
            self.progress.clip_completed(out);
        }
        self.pool.swap();
        let Some(next) = self.pool.current().clip_index() else {
            return Err(StitchError::evaluation("swap left no clip on screen"));
        };
        if !self.pool.current().is_ready() {
            return Err(StitchError::evaluation("swapped in a slot that is not ready"));
        }
        self.phases[next].advance(ClipPhase::SoloPlay)?;
        self.progress
            .clip_started(next, &self.timeline.clip(next).id);
        Ok(())
    }

    fn solo(&mut self, clip: usize, frames: u64) -> StitchResult<()> {
        tracing::debug!(clip = %self.timeline.clip(clip).id, frames, "solo phase");
        for _ in 0..frames {
            self.cancel.check()?;
            let cur = self.pool.current_mut();
            let frame = cur.pull_frame()?.cloned();
            let audio = self.mixer.mix_tick(&mut [cur])?;
            let out = self.compositor.render_solo(frame.as_ref(), Some(clip))?;
            self.push(&out, &audio)?;
        }
        if clip + 1 == self.timeline.len() {
            self.phases[clip].advance(ClipPhase::Done)?;
            self.progress.clip_completed(clip);
        }
        Ok(())
    }

    fn transition(
        &mut self,
        outgoing: usize,
        incoming: usize,
        kind: TransitionKind,
        duration: f64,
        frames: u64,
        plan: &StitchPlan,
    ) -> StitchResult<()> {
        tracing::debug!(
            from = %self.timeline.clip(outgoing).id,
            to = %self.timeline.clip(incoming).id,
            kind = kind.as_str(),
            duration,
            frames,
            "transition phase"
        );
        if !self.pool.standby().is_ready() || self.pool.standby().clip_index() != Some(incoming) {
            return Err(StitchError::evaluation(
                "incoming clip is not loaded before its transition",
            ));
        }
        self.phases[outgoing].advance(ClipPhase::Transitioning)?;

        let frame_dur = plan.fps.frame_duration_secs();
        for k in 0..frames {
            self.cancel.check()?;
            let t = progress(k as f64 * frame_dur, duration);
            let (gain_out, gain_in) = crossfade_gains(t);

            let (cur, stb) = self.pool.pair_mut();
            cur.set_volume(gain_out);
            stb.set_volume(gain_in);
            let out_frame = cur.pull_frame()?.cloned();
            let in_frame = stb.pull_frame()?.cloned();
            let audio = self.mixer.mix_tick(&mut [cur, stb])?;

            let out = self.compositor.render_transition(
                out_frame.as_ref(),
                in_frame.as_ref(),
                kind,
                t,
                Some(outgoing),
            )?;
            self.push(&out, &audio)?;
        }
        Ok(())
    }

    fn push(&mut self, frame: &FrameRGBA, audio: &[f32]) -> StitchResult<()> {
        self.sink.push(frame, audio)?;
        self.frames_pushed += 1;
        Ok(())
    }
}

/// Composite the single output frame shown at `at_secs` of the stitched movie.
///
/// Runs the same validation as [`stitch`], loads only the clip(s) visible at that instant and
/// releases them before returning.
#[tracing::instrument(skip(clips, opts, provider))]
pub fn render_still(
    clips: &[Clip],
    opts: &StitchOptions,
    provider: &dyn MediaProvider,
    at_secs: f64,
) -> StitchResult<FrameRGBA> {
    if !at_secs.is_finite() || at_secs < 0.0 {
        return Err(StitchError::validation(format!(
            "still time must be finite and >= 0, got {at_secs}"
        )));
    }
    let Prepared { timeline, plan } = prepare(clips, opts)?;
    let frame_idx = plan
        .fps
        .secs_to_frames_round(at_secs)
        .min(plan.total_frames - 1);
    let (step_idx, offset) = plan
        .locate(frame_idx)
        .ok_or_else(|| StitchError::evaluation("no step covers the requested frame"))?;
    let elapsed = offset as f64 * plan.fps.frame_duration_secs();

    let cancel = CancelToken::new();
    let loader = ClipLoader::new(
        provider,
        OpenOptions {
            fps: opts.fps,
            sample_rate: MIX_SAMPLE_RATE,
        },
        &cancel,
    );
    let mut compositor = build_compositor(&timeline, opts)?;
    let mut pool = SlotPool::new();

    let media_time = |clip: usize, from: f64| {
        let w = timeline.window(clip);
        (from + elapsed).min(w.native_end - 1e-3).max(w.trim_start)
    };

    match plan.steps[step_idx] {
        Step::Solo { clip, .. } => {
            let from = timeline.window(clip).trim_start
                + timeline.transition_before(clip).map(|t| t.duration).unwrap_or(0.0);
            let slot = pool.standby_mut();
            loader.load(slot, clip, timeline.clip(clip))?;
            loader.seek(slot, media_time(clip, from))?;
            pool.swap();
            let frame = pool.current_mut().pull_frame()?.cloned();
            compositor.render_solo(frame.as_ref(), Some(clip))
        }
        Step::Transition {
            outgoing,
            incoming,
            kind,
            duration,
            ..
        } => {
            let slot = pool.standby_mut();
            loader.load(slot, outgoing, timeline.clip(outgoing))?;
            loader.seek(slot, media_time(outgoing, timeline.solo_end(outgoing)))?;
            pool.swap();
            let slot = pool.standby_mut();
            loader.load(slot, incoming, timeline.clip(incoming))?;
            loader.seek(slot, media_time(incoming, timeline.window(incoming).trim_start))?;

            let (cur, stb) = pool.pair_mut();
            let out_frame = cur.pull_frame()?.cloned();
            let in_frame = stb.pull_frame()?.cloned();
            compositor.render_transition(
                out_frame.as_ref(),
                in_frame.as_ref(),
                kind,
                progress(elapsed, duration),
                Some(outgoing),
            )
        }
        Step::Load { .. } | Step::Swap => Err(StitchError::evaluation(
            "located a step that renders no frames",
        )),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/stitcher.rs"]
mod tests;
