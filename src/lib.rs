//! Real-time snore detection with OSC mute control.
//!
//! The pipeline captures microphone audio, band-limits it to the snore
//! band, extracts per-frame features, and promotes snore-like frames
//! through duration and breathing-periodicity validation before muting a
//! remote endpoint over OSC. Capture runs on the real-time audio thread
//! and hands blocks to a single detection thread through a lock-free
//! buffer pool.

pub mod audio;
pub mod config;
pub mod detect;
pub mod dsp;
pub mod error;
pub mod osc;
pub mod session;
pub mod telemetry;

pub use audio::AudioBlock;
pub use config::{AppConfig, AudioConfig, ConfigHandle, NotifyConfig, SensitivityConfig};
pub use detect::{CandidateEvent, ControlSink, DetectionPipeline, MuteCommand};
pub use dsp::FeatureVector;
pub use error::DetectorError;
pub use session::DetectionSession;
pub use telemetry::DetectionEvent;
