use std::time::{Duration, Instant};

/// Minimum wall-clock gap between two intermediate reports.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// One progress notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Progress {
    /// Timeline index of the clip being processed, `None` for stitch-level messages.
    pub clip: Option<usize>,
    /// `0..=100`; only the final report reaches 100.
    pub percent: u8,
    pub message: String,
}

/// Throttled, monotonic progress at per-clip granularity.
pub struct ProgressReporter<'a> {
    callback: &'a mut dyn FnMut(&Progress),
    total_clips: usize,
    min_interval: Duration,
    last_emit: Option<Instant>,
    last_percent: u8,
    finished: bool,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(total_clips: usize, callback: &'a mut dyn FnMut(&Progress)) -> Self {
        Self {
            callback,
            total_clips: total_clips.max(1),
            min_interval: DEFAULT_MIN_INTERVAL,
            last_emit: None,
            last_percent: 0,
            finished: false,
        }
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Percent for `completed` finished clips, capped below 100.
    pub fn percent_for(&self, completed: usize) -> u8 {
        let pct = completed.min(self.total_clips) * 100 / self.total_clips;
        pct.min(99) as u8
    }

    pub fn clip_started(&mut self, clip: usize, clip_id: &str) {
        let percent = self.percent_for(clip);
        self.report_at(
            Instant::now(),
            Some(clip),
            percent,
            &format!("Rendering clip {}/{} ({clip_id})", clip + 1, self.total_clips),
        );
    }

    pub fn clip_completed(&mut self, clip: usize) {
        let percent = self.percent_for(clip + 1);
        self.report_at(
            Instant::now(),
            Some(clip),
            percent,
            &format!("Finished clip {}/{}", clip + 1, self.total_clips),
        );
    }

    /// Emit unless throttled. Returns whether the callback ran.
    pub fn report_at(
        &mut self,
        now: Instant,
        clip: Option<usize>,
        percent: u8,
        message: &str,
    ) -> bool {
        if self.finished {
            return false;
        }
        if let Some(last) = self.last_emit
            && now.saturating_duration_since(last) < self.min_interval
        {
            return false;
        }
        let percent = percent.min(99).max(self.last_percent);
        self.emit(now, clip, percent, message);
        true
    }

    /// Emit the terminal 100 %, bypassing the throttle. Later calls are ignored.
    pub fn finish(&mut self, message: &str) {
        if self.finished {
            return;
        }
        self.emit(Instant::now(), None, 100, message);
        self.finished = true;
    }

    pub fn last_percent(&self) -> u8 {
        self.last_percent
    }

    fn emit(&mut self, now: Instant, clip: Option<usize>, percent: u8, message: &str) {
        self.last_emit = Some(now);
        self.last_percent = percent;
        (self.callback)(&Progress {
            clip,
            percent,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/progress.rs"]
mod tests;
