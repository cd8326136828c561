//! Telemetry event types describing pipeline activity exposed to CLI and
//! embedding layers.

use serde::{Deserialize, Serialize};

/// Pipeline events covering frame verdicts, event lifecycle, and transport
/// state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DetectionEvent {
    /// Frame verdict flipped (emitted on transitions, not every frame)
    FrameVerdict {
        snore_like: bool,
        energy: f32,
        f0_hz: Option<f32>,
        centroid_hz: f32,
        zcr: f32,
        timestamp_ms: u64,
    },
    /// A frame run passed the duration bounds
    CandidateDetected {
        start_ms: u64,
        end_ms: u64,
        duration_ms: u64,
        frame_count: u32,
    },
    /// Enough candidates inside the periodicity window
    SnoringConfirmed {
        timestamp_ms: u64,
        events_in_window: usize,
    },
    /// The gate changed the remote mute state
    MuteChanged { muted: bool, timestamp_ms: u64 },
    /// Capture blocks discarded under queue pressure since session start
    BlocksDropped { total: u64 },
    /// Recoverable pipeline error
    Error { context: String },
}
