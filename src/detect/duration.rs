// DurationValidator - turns frame verdicts into candidate events
//
// Small state machine with hangover: an active event bridges up to
// `false_frame_tolerance` consecutive non-snore frames before closing, so a
// single misclassified frame in the middle of a snore does not split it in
// two. The event end is the timestamp of the last snore-like frame, not of
// the frame that closed it.

use log::debug;

use crate::config::SensitivityConfig;

/// A completed run of snore-like frames that passed the duration bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateEvent {
    /// Timestamp of the first snore-like frame, ms
    pub start_ms: u64,
    /// Timestamp of the last snore-like frame, ms
    pub end_ms: u64,
    /// Snore-like frames inside the run (bridged frames excluded)
    pub frame_count: u32,
}

impl CandidateEvent {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Active {
        start_ms: u64,
        last_true_ms: u64,
        true_frames: u32,
        false_streak: u32,
    },
}

/// Validates candidate events against the configured duration bounds.
pub struct DurationValidator {
    state: State,
}

impl DurationValidator {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Feed one frame verdict. Returns a candidate when a run closes and
    /// its duration lies within `[min_event_duration_ms,
    /// max_event_duration_ms]`.
    pub fn observe(
        &mut self,
        snore_like: bool,
        timestamp_ms: u64,
        config: &SensitivityConfig,
    ) -> Option<CandidateEvent> {
        match self.state {
            State::Idle => {
                if snore_like {
                    self.state = State::Active {
                        start_ms: timestamp_ms,
                        last_true_ms: timestamp_ms,
                        true_frames: 1,
                        false_streak: 0,
                    };
                }
                None
            }
            State::Active {
                start_ms,
                last_true_ms,
                true_frames,
                false_streak,
            } => {
                if snore_like {
                    self.state = State::Active {
                        start_ms,
                        last_true_ms: timestamp_ms,
                        true_frames: true_frames + 1,
                        false_streak: 0,
                    };
                    return None;
                }

                let false_streak = false_streak + 1;
                if false_streak <= config.false_frame_tolerance {
                    self.state = State::Active {
                        start_ms,
                        last_true_ms,
                        true_frames,
                        false_streak,
                    };
                    return None;
                }

                self.state = State::Idle;
                let event = CandidateEvent {
                    start_ms,
                    end_ms: last_true_ms,
                    frame_count: true_frames,
                };
                let duration = event.duration_ms();
                if duration >= config.min_event_duration_ms
                    && duration <= config.max_event_duration_ms
                {
                    Some(event)
                } else {
                    debug!(
                        "[Duration] Discarded {} ms run outside [{}, {}] ms",
                        duration, config.min_event_duration_ms, config.max_event_duration_ms
                    );
                    None
                }
            }
        }
    }

    /// Whether a run is currently open.
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active { .. })
    }

    /// Discard any open run, e.g. on session stop.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}

impl Default for DurationValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: u64 = 20;

    fn feed(
        validator: &mut DurationValidator,
        config: &SensitivityConfig,
        verdicts: &[bool],
    ) -> Vec<CandidateEvent> {
        verdicts
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| validator.observe(v, i as u64 * FRAME_MS, config))
            .collect()
    }

    fn pattern(true_frames: usize, false_frames: usize) -> Vec<bool> {
        let mut v = vec![true; true_frames];
        v.extend(vec![false; false_frames]);
        v
    }

    #[test]
    fn test_valid_run_emits_candidate() {
        let config = SensitivityConfig::default();
        let mut validator = DurationValidator::new();

        // 20 true frames = 380 ms span, inside [200, 3000]
        let events = feed(&mut validator, &config, &pattern(20, 5));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_ms, 0);
        assert_eq!(events[0].end_ms, 19 * FRAME_MS);
        assert_eq!(events[0].frame_count, 20);
    }

    #[test]
    fn test_short_run_discarded() {
        let config = SensitivityConfig::default();
        let mut validator = DurationValidator::new();

        // 5 true frames = 80 ms span, below the 200 ms minimum
        let events = feed(&mut validator, &config, &pattern(5, 5));
        assert!(events.is_empty());
        assert!(!validator.is_active());
    }

    #[test]
    fn test_long_run_discarded() {
        let config = SensitivityConfig::default();
        let mut validator = DurationValidator::new();

        // 200 true frames = 3980 ms span, above the 3000 ms maximum
        let events = feed(&mut validator, &config, &pattern(200, 5));
        assert!(events.is_empty());
    }

    #[test]
    fn test_tolerated_false_frames_bridge_a_run() {
        let config = SensitivityConfig::default();
        let mut validator = DurationValidator::new();

        // true x10, false x2 (== tolerance), true x10, then close
        let mut verdicts = vec![true; 10];
        verdicts.extend([false, false]);
        verdicts.extend(vec![true; 10]);
        verdicts.extend(vec![false; 5]);

        let events = feed(&mut validator, &config, &verdicts);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_ms, 0);
        assert_eq!(events[0].end_ms, 21 * FRAME_MS);
        // Bridged false frames do not count
        assert_eq!(events[0].frame_count, 20);
    }

    #[test]
    fn test_streak_beyond_tolerance_closes_at_last_true_frame() {
        let config = SensitivityConfig::default();
        let mut validator = DurationValidator::new();

        let events = feed(&mut validator, &config, &pattern(15, 10));
        assert_eq!(events.len(), 1);
        // End is the last snore-like frame, not the closing false frame
        assert_eq!(events[0].end_ms, 14 * FRAME_MS);
    }

    #[test]
    fn test_reset_discards_open_run() {
        let config = SensitivityConfig::default();
        let mut validator = DurationValidator::new();

        for i in 0..20 {
            validator.observe(true, i * FRAME_MS, &config);
        }
        assert!(validator.is_active());
        validator.reset();
        assert!(!validator.is_active());

        // Closing frames after reset produce nothing
        let events = feed(&mut validator, &config, &vec![false; 5]);
        assert!(events.is_empty());
    }
}
