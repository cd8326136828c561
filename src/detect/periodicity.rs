// PeriodicityValidator - breathing-rhythm confirmation
//
// Single candidate events are too easy to fake (a cough, a passing truck).
// Real snoring repeats with the breathing cycle, so detection is only
// confirmed once enough candidates fall inside a trailing window. The
// window is NOT cleared on confirmation: an ongoing snoring episode keeps
// re-confirming from the same history instead of having to build up a
// fresh set of events each time.

use std::collections::VecDeque;

use log::debug;

use crate::config::SensitivityConfig;
use crate::detect::duration::CandidateEvent;

/// Sliding-window event counter confirming periodic snoring.
pub struct PeriodicityValidator {
    /// Start timestamps of recent candidate events, oldest first
    starts: VecDeque<u64>,
}

impl PeriodicityValidator {
    pub fn new() -> Self {
        Self {
            starts: VecDeque::new(),
        }
    }

    /// Record one candidate event and report whether snoring is confirmed.
    pub fn observe(&mut self, event: &CandidateEvent, config: &SensitivityConfig) -> bool {
        self.starts.push_back(event.start_ms);
        self.prune(event.start_ms, config);

        let confirmed = self.starts.len() >= config.min_events_in_window;
        debug!(
            "[Periodicity] {} event(s) in window, confirmed={}",
            self.starts.len(),
            confirmed
        );
        confirmed
    }

    /// Drop events older than the trailing window ending at `now_ms`.
    pub fn prune(&mut self, now_ms: u64, config: &SensitivityConfig) {
        let cutoff = now_ms.saturating_sub(config.periodicity_window_ms);
        while let Some(&oldest) = self.starts.front() {
            if oldest < cutoff {
                self.starts.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn events_in_window(&self) -> usize {
        self.starts.len()
    }

    /// Forget all history, e.g. on session stop.
    pub fn clear(&mut self) {
        self.starts.clear();
    }
}

impl Default for PeriodicityValidator {
    fn default() -> Self {
        Self::new()
    }
}
