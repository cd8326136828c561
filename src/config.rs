//! Configuration management for the detection pipeline
//!
//! All tunable parameters live here: the shared, UI-mutable
//! [`SensitivityConfig`] read by the classifier and validators, plus the
//! static audio and notification settings loaded once at startup. Runtime
//! configuration can be loaded from a JSON file for fast iteration without
//! recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::DetectorError;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub sensitivity: SensitivityConfig,
    pub notify: NotifyConfig,
}

/// Audio capture and framing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Samples per analysis frame (one frame = one classified unit)
    pub block_size: usize,
    /// Number of hand-off buffers pre-allocated for the capture thread
    pub buffer_pool_size: usize,
    /// Size of each hand-off buffer in samples
    pub buffer_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            // 20 ms frames at 16 kHz
            block_size: 320,
            buffer_pool_size: 16,
            buffer_size: 2048,
        }
    }
}

/// Notification transport parameters (OSC over UDP)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Destination host for control messages
    pub host: String,
    /// Destination UDP port
    pub port: u16,
    /// OSC address the mute/unmute boolean is sent to
    pub mute_address: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            mute_address: "/snoreguard/mute".to_string(),
        }
    }
}

/// Shared, UI-mutable detection thresholds.
///
/// The pipeline never reads these fields through the shared handle directly;
/// it takes one cloned snapshot per frame via [`ConfigHandle::snapshot`] so a
/// concurrent update can never produce a torn mix of old and new fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityConfig {
    /// Master sensitivity in [0, 1]; 0.5 is neutral, higher widens acceptance
    pub sensitivity: f32,
    /// Frame energy threshold (mean squared amplitude)
    pub energy_threshold: f32,
    /// Accepted fundamental frequency range in Hz [low, high]
    pub f0_range_hz: [f32; 2],
    /// Spectral centroid upper bound in Hz
    pub centroid_threshold_hz: f32,
    /// Accepted zero-crossing-rate range [low, high]
    pub zcr_range: [f32; 2],
    /// Minimum candidate event duration in ms
    pub min_event_duration_ms: u64,
    /// Maximum candidate event duration in ms
    pub max_event_duration_ms: u64,
    /// Trailing window for breathing-periodicity confirmation in ms
    pub periodicity_window_ms: u64,
    /// Candidate events required inside the window to confirm
    pub min_events_in_window: usize,
    /// Consecutive non-snore frames bridged before an active event closes
    pub false_frame_tolerance: u32,
    /// Quiet time after the last confirmation before unmute is sent, in ms
    pub silence_timeout_ms: u64,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.5,
            // 0.015 RMS expressed as mean squared amplitude
            energy_threshold: 2.25e-4,
            f0_range_hz: [70.0, 150.0],
            centroid_threshold_hz: 500.0,
            zcr_range: [0.0, 0.06],
            min_event_duration_ms: 200,
            max_event_duration_ms: 3_000,
            periodicity_window_ms: 45_000,
            min_events_in_window: 4,
            false_frame_tolerance: 2,
            silence_timeout_ms: 30_000,
        }
    }
}

impl SensitivityConfig {
    /// Check all cross-field invariants.
    ///
    /// Returns `ConfigOutOfRange` describing the first violation; callers
    /// keep their previously valid config when this fails.
    pub fn validate(&self) -> Result<(), DetectorError> {
        let reject = |reason: &str| {
            Err(DetectorError::ConfigOutOfRange {
                reason: reason.to_string(),
            })
        };

        if !(0.0..=1.0).contains(&self.sensitivity) {
            return reject("sensitivity must be within [0, 1]");
        }
        if !(self.energy_threshold > 0.0) {
            return reject("energy_threshold must be positive");
        }
        if !(self.f0_range_hz[0] > 0.0) || self.f0_range_hz[0] > self.f0_range_hz[1] {
            return reject("f0_range_hz must satisfy 0 < low <= high");
        }
        if !(self.centroid_threshold_hz > 0.0) {
            return reject("centroid_threshold_hz must be positive");
        }
        if self.zcr_range[0] < 0.0
            || self.zcr_range[1] > 1.0
            || self.zcr_range[0] > self.zcr_range[1]
        {
            return reject("zcr_range must satisfy 0 <= low <= high <= 1");
        }
        if self.min_event_duration_ms > self.max_event_duration_ms {
            return reject("min_event_duration_ms exceeds max_event_duration_ms");
        }
        if self.periodicity_window_ms == 0 {
            return reject("periodicity_window_ms must be positive");
        }
        if self.min_events_in_window == 0 {
            return reject("min_events_in_window must be at least 1");
        }
        if self.silence_timeout_ms == 0 {
            return reject("silence_timeout_ms must be positive");
        }
        Ok(())
    }

    /// Acceptance widening factor derived from the master sensitivity.
    ///
    /// Maps [0, 1] onto [0.5, 2.0] with 0.5 -> 1.0, monotonically increasing.
    pub fn widening_factor(&self) -> f32 {
        2f32.powf(2.0 * (self.sensitivity - 0.5))
    }

    /// Energy threshold after sensitivity scaling (higher sensitivity lowers
    /// the bar).
    pub fn effective_energy_threshold(&self) -> f32 {
        self.energy_threshold / self.widening_factor()
    }

    /// Centroid upper bound after sensitivity scaling (higher sensitivity
    /// raises the bar).
    pub fn effective_centroid_threshold(&self) -> f32 {
        self.centroid_threshold_hz * self.widening_factor()
    }

    /// F0 acceptance range widened around its configured bounds.
    pub fn effective_f0_range(&self) -> (f32, f32) {
        let w = self.widening_factor().sqrt();
        (self.f0_range_hz[0] / w, self.f0_range_hz[1] * w)
    }

    /// ZCR acceptance range widened toward [0, 1].
    pub fn effective_zcr_range(&self) -> (f32, f32) {
        let w = self.widening_factor();
        let low = (self.zcr_range[0] / w).max(0.0);
        let high = (self.zcr_range[1] * w).min(1.0);
        (low, high)
    }
}

/// Thread-safe handle around the shared sensitivity config.
///
/// The UI thread calls [`update`](ConfigHandle::update) at arbitrary
/// frequency; the pipeline thread calls [`snapshot`](ConfigHandle::snapshot)
/// once per frame. Updates are validated before being swapped in, so the
/// handle always holds a valid config.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<SensitivityConfig>>,
}

impl ConfigHandle {
    pub fn new(config: SensitivityConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(config)),
        })
    }

    /// Clone the current config as one consistent snapshot.
    pub fn snapshot(&self) -> SensitivityConfig {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                // A writer panicking mid-update cannot tear the struct; the
                // poisoned value is still the last fully written one.
                log::error!("[Config] sensitivity lock poisoned, reusing last value");
                poisoned.into_inner().clone()
            }
        }
    }

    /// Validate and atomically swap in a new config.
    ///
    /// On `ConfigOutOfRange` the previously active config stays in effect.
    pub fn update(&self, config: SensitivityConfig) -> Result<(), DetectorError> {
        config.validate()?;
        let mut guard = self
            .inner
            .write()
            .map_err(|_| DetectorError::LockPoisoned {
                component: "SensitivityConfig".to_string(),
            })?;
        *guard = config;
        Ok(())
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SensitivityConfig::default())),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            sensitivity: SensitivityConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, falling back to defaults if the
    /// file is missing or malformed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => match config.sensitivity.validate() {
                    Ok(()) => {
                        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                        config
                    }
                    Err(err) => {
                        log::warn!(
                            "[Config] {:?} contains invalid sensitivity settings: {}. Using defaults.",
                            path.as_ref(),
                            err
                        );
                        Self::default()
                    }
                },
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
