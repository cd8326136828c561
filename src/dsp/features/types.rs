// Types module - per-frame feature vector

/// Features extracted from one analysis frame of band-limited audio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    /// Mean-square frame energy (amplitude squared, not dB)
    pub energy: f32,
    /// Fundamental frequency estimate in Hz, `None` when unvoiced
    pub f0_hz: Option<f32>,
    /// Spectral centroid in Hz
    pub centroid_hz: f32,
    /// Zero-crossing rate in [0, 1]
    pub zcr: f32,
    /// Capture time of the frame start, ms since session start
    pub timestamp_ms: u64,
}
