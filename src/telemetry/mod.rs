//! Detection telemetry collector and helpers.
//!
//! The collector multiplexes frame verdicts, event lifecycle, drop counts,
//! and transport state into a bounded history plus async broadcast stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

use crate::detect::CandidateEvent;
use crate::dsp::FeatureVector;

pub mod events;

pub use events::DetectionEvent;

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<DetectionEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of events.
pub struct TelemetryCollector {
    tx: broadcast::Sender<DetectionEvent>,
    history: Mutex<VecDeque<DetectionEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: DetectionEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self.history.lock().expect("history poisoned");
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DetectionEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.history.lock().expect("history poisoned");
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 128)
    }
}

/// Top-level hub wrapping the collector plus per-stream debounce state.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    last_verdict: Mutex<Option<bool>>,
    last_drop_total: AtomicU64,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            last_verdict: Mutex::new(None),
            last_drop_total: AtomicU64::new(0),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    /// Record one frame verdict; only transitions are published so a long
    /// stretch of identical frames does not flood subscribers.
    pub fn record_frame(&self, features: &FeatureVector, snore_like: bool) {
        let mut last = self.last_verdict.lock().expect("verdict lock poisoned");
        if *last == Some(snore_like) {
            return;
        }
        *last = Some(snore_like);
        drop(last);

        self.collector.publish(DetectionEvent::FrameVerdict {
            snore_like,
            energy: features.energy,
            f0_hz: features.f0_hz,
            centroid_hz: features.centroid_hz,
            zcr: features.zcr,
            timestamp_ms: features.timestamp_ms,
        });
    }

    pub fn record_candidate(&self, event: &CandidateEvent) {
        self.collector.publish(DetectionEvent::CandidateDetected {
            start_ms: event.start_ms,
            end_ms: event.end_ms,
            duration_ms: event.duration_ms(),
            frame_count: event.frame_count,
        });
    }

    pub fn record_confirmed(&self, timestamp_ms: u64, events_in_window: usize) {
        self.collector.publish(DetectionEvent::SnoringConfirmed {
            timestamp_ms,
            events_in_window,
        });
    }

    pub fn record_mute_change(&self, muted: bool, timestamp_ms: u64) {
        self.collector
            .publish(DetectionEvent::MuteChanged { muted, timestamp_ms });
    }

    /// Record the running drop total; publishes only when it grew.
    pub fn record_drop_total(&self, total: u64) {
        let previous = self.last_drop_total.swap(total, Ordering::Relaxed);
        if total > previous {
            self.collector.publish(DetectionEvent::BlocksDropped { total });
        }
    }

    pub fn record_error(&self, context: impl Into<String>) {
        self.collector.publish(DetectionEvent::Error {
            context: context.into(),
        });
    }

    /// Reset debounce state at session start.
    pub fn reset_session_state(&self) {
        *self.last_verdict.lock().expect("verdict lock poisoned") = None;
        self.last_drop_total.store(0, Ordering::Relaxed);
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(snore_like_energy: f32, timestamp_ms: u64) -> FeatureVector {
        FeatureVector {
            energy: snore_like_energy,
            f0_hz: Some(100.0),
            centroid_hz: 300.0,
            zcr: 0.03,
            timestamp_ms,
        }
    }

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(DetectionEvent::BlocksDropped { total: 1 });
        collector.publish(DetectionEvent::BlocksDropped { total: 2 });
        collector.publish(DetectionEvent::MuteChanged {
            muted: true,
            timestamp_ms: 10,
        });

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 3);
        assert!(matches!(
            snapshot.recent[0],
            DetectionEvent::BlocksDropped { total: 1 }
        ));
        assert!(matches!(
            snapshot.recent[2],
            DetectionEvent::MuteChanged { .. }
        ));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        for total in 1..=3 {
            collector.publish(DetectionEvent::BlocksDropped { total });
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.dropped_events, 1);
        assert!(matches!(
            snapshot.recent[0],
            DetectionEvent::BlocksDropped { total: 2 }
        ));
    }

    #[test]
    fn hub_debounces_identical_verdicts() {
        let hub = TelemetryHub::new(8, 8);
        hub.record_frame(&frame(1e-3, 0), true);
        hub.record_frame(&frame(1e-3, 20), true);
        hub.record_frame(&frame(1e-6, 40), false);
        hub.record_frame(&frame(1e-6, 60), false);

        let snapshot = hub.snapshot();
        let verdicts: Vec<_> = snapshot
            .recent
            .iter()
            .filter(|e| matches!(e, DetectionEvent::FrameVerdict { .. }))
            .collect();
        assert_eq!(verdicts.len(), 2);
    }

    #[test]
    fn hub_publishes_drop_total_only_on_growth() {
        let hub = TelemetryHub::new(8, 8);
        hub.record_drop_total(0);
        hub.record_drop_total(3);
        hub.record_drop_total(3);
        hub.record_drop_total(5);

        let snapshot = hub.snapshot();
        let drops: Vec<_> = snapshot
            .recent
            .iter()
            .filter(|e| matches!(e, DetectionEvent::BlocksDropped { .. }))
            .collect();
        assert_eq!(drops.len(), 2);
    }
}
