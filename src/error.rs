// Error types for the snore detection pipeline
//
// Every pipeline-internal failure is recovered locally (block dropped, frame
// treated as not-snore-like); only DeviceLost and persistent transport
// failures are surfaced to the embedding layer. No error may halt the
// consumer loop.

use std::fmt;

/// Errors produced by the detection pipeline and its boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// Audio block had the wrong sample count (dropped, counted, non-fatal)
    InvalidBlock { expected: usize, actual: usize },

    /// Notification transport send failed (logged, non-fatal, self-heals)
    Transport { reason: String },

    /// A sensitivity config update violates invariants (rejected, previous
    /// config retained)
    ConfigOutOfRange { reason: String },

    /// Input stream terminated unexpectedly (session-ending)
    DeviceLost { reason: String },

    /// Detection session is already running
    AlreadyRunning,

    /// Detection session is not running
    NotRunning,

    /// Requested input device was not found
    DeviceNotFound { name: String },

    /// Failed to open the input stream
    StreamOpenFailed { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl DetectorError {
    pub fn message(&self) -> String {
        match self {
            DetectorError::InvalidBlock { expected, actual } => {
                format!(
                    "Malformed audio block: expected {} samples, got {}",
                    expected, actual
                )
            }
            DetectorError::Transport { reason } => {
                format!("Notification transport failed: {}", reason)
            }
            DetectorError::ConfigOutOfRange { reason } => {
                format!("Sensitivity config rejected: {}", reason)
            }
            DetectorError::DeviceLost { reason } => {
                format!("Audio input device lost: {}", reason)
            }
            DetectorError::AlreadyRunning => {
                "Detection session already running. Call stop() first.".to_string()
            }
            DetectorError::NotRunning => {
                "Detection session not running. Call start() first.".to_string()
            }
            DetectorError::DeviceNotFound { name } => {
                format!("Input device not found: {}", name)
            }
            DetectorError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            DetectorError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for DetectorError {}

impl From<std::io::Error> for DetectorError {
    fn from(err: std::io::Error) -> Self {
        DetectorError::Transport {
            reason: err.to_string(),
        }
    }
}
