// NotificationGate - debounced mute/unmute decisions
//
// The gate owns the desired mute state and keeps the remote endpoint in
// sync with it. Confirmations while already muted only refresh the silence
// timer; nothing is re-sent. A failed send leaves the gate out of sync and
// the next tick retries, so a transient transport outage heals without
// dropping a state change.

use log::{info, warn};

use crate::config::SensitivityConfig;
use crate::error::DetectorError;

/// Command driving the remote mute state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteCommand {
    Mute,
    Unmute,
}

impl MuteCommand {
    pub fn is_mute(self) -> bool {
        matches!(self, MuteCommand::Mute)
    }

    fn for_state(muted: bool) -> Self {
        if muted {
            MuteCommand::Mute
        } else {
            MuteCommand::Unmute
        }
    }
}

/// Transport for mute commands, e.g. OSC over UDP.
pub trait ControlSink {
    fn send(&mut self, command: MuteCommand) -> Result<(), DetectorError>;
}

/// Debounces confirmations into at most one mute and one unmute per episode.
pub struct NotificationGate {
    sink: Box<dyn ControlSink + Send>,
    /// Desired remote state
    muted: bool,
    /// Whether the remote has acknowledged the desired state
    synced: bool,
    /// Timestamp of the most recent confirmation, ms
    last_confirm_ms: Option<u64>,
}

impl NotificationGate {
    pub fn new(sink: Box<dyn ControlSink + Send>) -> Self {
        Self {
            sink,
            muted: false,
            // No traffic until the first confirmed mute
            synced: true,
            last_confirm_ms: None,
        }
    }

    /// Handle one confirmed detection at `now_ms`.
    pub fn on_confirmed(&mut self, now_ms: u64) {
        self.last_confirm_ms = Some(now_ms);
        if !self.muted {
            info!("[Gate] Snoring confirmed at {} ms, muting", now_ms);
            self.muted = true;
            self.synced = false;
        }
        self.flush();
    }

    /// Periodic tick: expire the silence timeout and retry unsynced sends.
    pub fn evaluate(&mut self, now_ms: u64, config: &SensitivityConfig) {
        if self.muted {
            if let Some(last) = self.last_confirm_ms {
                if now_ms.saturating_sub(last) >= config.silence_timeout_ms {
                    info!("[Gate] {} ms of quiet, unmuting", config.silence_timeout_ms);
                    self.muted = false;
                    self.synced = false;
                }
            }
        }
        self.flush();
    }

    /// Drive the remote back to unmuted on session stop. Sends nothing
    /// when the session never muted.
    pub fn force_unmute(&mut self) {
        if self.muted {
            self.muted = false;
            self.synced = false;
        }
        self.last_confirm_ms = None;
        self.flush();
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn flush(&mut self) {
        if self.synced {
            return;
        }
        match self.sink.send(MuteCommand::for_state(self.muted)) {
            Ok(()) => {
                self.synced = true;
            }
            Err(err) => {
                // Stay unsynced; the next on_confirmed/evaluate retries.
                warn!("[Gate] Send failed, will retry: {}", err);
            }
        }
    }
}
