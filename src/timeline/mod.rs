//! Timeline construction and duration accounting.
//!
//! The timeline is the ordered subsequence of completed clips. It is computed once per stitch,
//! validated before any engine resource is allocated, and never mutated afterwards.

pub mod plan;

use crate::foundation::error::{StitchError, StitchResult};
use crate::model::{Clip, ClipStatus, TransitionKind};

/// Playable window of one clip in its own media time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipWindow {
    pub trim_start: f64,
    /// `nativeDuration - trimEnd`.
    pub native_end: f64,
}

impl ClipWindow {
    pub fn len_secs(self) -> f64 {
        (self.native_end - self.trim_start).max(0.0)
    }
}

/// A transition that will actually be rendered between two adjacent clips.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub kind: TransitionKind,
    /// Rendered duration in seconds, already clamped to both clips' play windows.
    pub duration: f64,
}

#[derive(Clone, Debug)]
pub struct Timeline {
    clips: Vec<Clip>,
    windows: Vec<ClipWindow>,
    /// `transitions[i]` joins clip `i` to clip `i + 1`.
    transitions: Vec<Option<Transition>>,
}

impl Timeline {
    /// Filter `clips` down to completed ones and validate trims and transitions.
    pub fn from_clips(clips: &[Clip]) -> StitchResult<Self> {
        let clips: Vec<Clip> = clips
            .iter()
            .filter(|c| c.status == ClipStatus::Completed)
            .cloned()
            .collect();
        if clips.is_empty() {
            return Err(StitchError::EmptyTimeline);
        }

        let windows = clips
            .iter()
            .map(clip_window)
            .collect::<StitchResult<Vec<_>>>()?;

        let mut transitions = Vec::with_capacity(clips.len().saturating_sub(1));
        let mut incoming_secs = 0.0;
        for i in 0..clips.len().saturating_sub(1) {
            let available_out = windows[i].len_secs() - incoming_secs;
            let tr = effective_transition(&clips[i], available_out, windows[i + 1].len_secs())?;
            incoming_secs = tr.map(|t| t.duration).unwrap_or(0.0);
            transitions.push(tr);
        }
        if let Some(last) = clips.last()
            && last.transition_into_next.is_some()
        {
            tracing::debug!(clip = %last.id, "ignoring transition on last clip");
        }

        Ok(Self {
            clips,
            windows,
            transitions,
        })
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clip(&self, i: usize) -> &Clip {
        &self.clips[i]
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Always `false`: construction fails on an empty timeline.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn window(&self, i: usize) -> ClipWindow {
        self.windows[i]
    }

    /// Transition from clip `i` into clip `i + 1`; `None` renders a hard cut.
    pub fn transition_after(&self, i: usize) -> Option<Transition> {
        self.transitions.get(i).copied().flatten()
    }

    /// Transition from clip `i - 1` into clip `i`.
    pub fn transition_before(&self, i: usize) -> Option<Transition> {
        i.checked_sub(1).and_then(|p| self.transition_after(p))
    }

    /// Media time at which clip `i` leaves its solo phase.
    pub fn solo_end(&self, i: usize) -> f64 {
        let w = self.windows[i];
        match self.transition_after(i) {
            Some(tr) => (w.native_end - tr.duration).max(w.trim_start),
            None => w.native_end,
        }
    }

    /// Clip `i`'s share of the output duration.
    ///
    /// Each transition is split evenly between the two clips it joins, so the pair counts its
    /// wall-clock length once.
    pub fn duration_contribution(&self, i: usize) -> f64 {
        let d_out = self.transition_after(i).map(|t| t.duration).unwrap_or(0.0);
        let d_in = self.transition_before(i).map(|t| t.duration).unwrap_or(0.0);
        self.windows[i].len_secs() - 0.5 * d_out - 0.5 * d_in
    }

    pub fn estimated_duration_secs(&self) -> f64 {
        (0..self.len()).map(|i| self.duration_contribution(i)).sum()
    }

    pub fn has_captions(&self) -> bool {
        self.clips.iter().any(|c| c.caption_text().is_some())
    }
}

fn clip_window(clip: &Clip) -> StitchResult<ClipWindow> {
    if !clip.duration.is_finite() || clip.duration <= 0.0 {
        return Err(StitchError::invalid_trim(
            &clip.id,
            format!("native duration must be finite and > 0, got {}", clip.duration),
        ));
    }
    if !clip.trim_start.is_finite() || !clip.trim_end.is_finite() {
        return Err(StitchError::invalid_trim(&clip.id, "trims must be finite"));
    }

    let trim_start = clip.trim_start.max(0.0);
    let trim_end = clip.trim_end.max(0.0);
    if trim_start + trim_end >= clip.duration {
        return Err(StitchError::invalid_trim(
            &clip.id,
            format!(
                "trimStart ({trim_start}) + trimEnd ({trim_end}) must be less than the native duration ({})",
                clip.duration
            ),
        ));
    }

    Ok(ClipWindow {
        trim_start,
        native_end: clip.duration - trim_end,
    })
}

fn effective_transition(
    clip: &Clip,
    available_out: f64,
    incoming_len: f64,
) -> StitchResult<Option<Transition>> {
    let Some(spec) = clip.transition_into_next else {
        return Ok(None);
    };
    if !spec.duration.is_finite() || spec.duration < 0.0 {
        return Err(StitchError::validation(format!(
            "clip '{}': transition duration must be finite and >= 0, got {}",
            clip.id, spec.duration
        )));
    }
    if spec.kind == TransitionKind::None {
        return Ok(None);
    }

    let duration = spec.duration.min(available_out).min(incoming_len).max(0.0);
    if duration <= 0.0 {
        return Ok(None);
    }
    if duration < spec.duration {
        tracing::debug!(
            clip = %clip.id,
            requested = spec.duration,
            rendered = duration,
            "transition clamped to adjacent play windows"
        );
    }
    Ok(Some(Transition {
        kind: spec.kind,
        duration,
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/timeline.rs"]
mod tests;
