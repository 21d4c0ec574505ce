//! Step schedule for one stitch.
//!
//! The plan fixes every phase boundary on the output frame grid up front. Boundaries sit at
//! `round(T * fps)` of their cumulative output time `T`, so rounding never accumulates across
//! clips.

use crate::foundation::core::Fps;
use crate::model::TransitionKind;
use crate::timeline::Timeline;

/// One scheduler step. Steps run strictly in order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// Load `clip` into the standby slot and seek it to `seek_to` (media seconds).
    Load { clip: usize, seek_to: f64 },
    /// Render `frames` ticks of `clip` alone from the current slot.
    Solo { clip: usize, frames: u64 },
    /// Render both slots together; the standby slot is the incoming clip.
    Transition {
        outgoing: usize,
        incoming: usize,
        kind: TransitionKind,
        duration: f64,
        frames: u64,
    },
    /// Stop the current slot, reset volumes and exchange slot roles.
    Swap,
}

impl Step {
    pub fn frames(&self) -> u64 {
        match *self {
            Step::Solo { frames, .. } | Step::Transition { frames, .. } => frames,
            Step::Load { .. } | Step::Swap => 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StitchPlan {
    pub fps: Fps,
    pub steps: Vec<Step>,
    pub total_frames: u64,
    pub transition_frames: u64,
}

impl StitchPlan {
    /// Output duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.total_frames)
    }

    /// Locate the rendering step covering output frame `frame`.
    ///
    /// Returns the step index and the tick offset inside that step.
    pub fn locate(&self, frame: u64) -> Option<(usize, u64)> {
        let mut start = 0u64;
        for (i, step) in self.steps.iter().enumerate() {
            let n = step.frames();
            if n > 0 && frame < start + n {
                return Some((i, frame - start));
            }
            start += n;
        }
        None
    }
}

pub fn plan_timeline(timeline: &Timeline, fps: Fps) -> StitchPlan {
    let n = timeline.len();
    let mut steps = Vec::with_capacity(n * 4);
    let mut out_secs = 0.0f64;
    let mut frames_done = 0u64;
    let mut transition_frames = 0u64;

    let advance = |out_secs: f64, frames_done: &mut u64| -> u64 {
        let end = fps.secs_to_frames_round(out_secs).max(*frames_done);
        let frames = end - *frames_done;
        *frames_done = end;
        frames
    };

    steps.push(Step::Load {
        clip: 0,
        seek_to: timeline.window(0).trim_start,
    });
    steps.push(Step::Swap);

    let mut media_pos = timeline.window(0).trim_start;
    for i in 0..n {
        let solo_secs = (timeline.solo_end(i) - media_pos).max(0.0);
        out_secs += solo_secs;
        let frames = advance(out_secs, &mut frames_done);
        steps.push(Step::Solo { clip: i, frames });

        if i + 1 == n {
            break;
        }

        let next_start = timeline.window(i + 1).trim_start;
        steps.push(Step::Load {
            clip: i + 1,
            seek_to: next_start,
        });
        match timeline.transition_after(i) {
            Some(tr) => {
                out_secs += tr.duration;
                let frames = advance(out_secs, &mut frames_done);
                transition_frames += frames;
                steps.push(Step::Transition {
                    outgoing: i,
                    incoming: i + 1,
                    kind: tr.kind,
                    duration: tr.duration,
                    frames,
                });
                media_pos = next_start + tr.duration;
            }
            None => media_pos = next_start,
        }
        steps.push(Step::Swap);
    }

    StitchPlan {
        fps,
        steps,
        total_frames: frames_done,
        transition_frames,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/plan.rs"]
mod tests;
