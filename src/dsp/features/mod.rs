// FeatureExtractor - per-frame features for snore/not-snore classification
//
// Module organization:
// - types: FeatureVector struct
// - fft: FFT computation with windowing
// - spectral: frequency-domain features (centroid)
// - temporal: time-domain features (energy, ZCR)
// - pitch: autocorrelation f0 estimation
// - mod.rs: coordinator (FeatureExtractor)
//
// Frames are 64 ms windows hopped every 20 ms over the band-limited
// signal, so each frame spans at least three periods of the lowest
// fundamental the pitch estimator searches for.

mod fft;
mod pitch;
mod spectral;
mod temporal;
mod types;

pub use types::FeatureVector;

use fft::{FftProcessor, FFT_SIZE};
use pitch::PitchEstimator;
use spectral::SpectralFeatures;
use temporal::TemporalFeatures;

/// Analysis frame length in samples (64 ms at 16 kHz)
pub const ANALYSIS_WINDOW: usize = 1024;
/// Frame hop in samples (20 ms at 16 kHz)
pub const HOP_SIZE: usize = 320;

/// Coordinates the feature extraction pipeline for one analysis frame.
pub struct FeatureExtractor {
    fft_processor: FftProcessor,
    spectral_features: SpectralFeatures,
    temporal_features: TemporalFeatures,
    pitch_estimator: PitchEstimator,
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            fft_processor: FftProcessor::new(FFT_SIZE),
            spectral_features: SpectralFeatures::new(sample_rate, FFT_SIZE),
            temporal_features: TemporalFeatures::new(),
            pitch_estimator: PitchEstimator::new(sample_rate),
        }
    }

    /// Extract all features from one analysis frame.
    ///
    /// `frame` should be `ANALYSIS_WINDOW` samples of band-limited audio;
    /// shorter input is zero-padded by the FFT and may come back unvoiced.
    pub fn extract(&mut self, frame: &[f32], timestamp_ms: u64) -> FeatureVector {
        let spectrum = self.fft_processor.magnitude_spectrum(frame);

        FeatureVector {
            energy: self.temporal_features.compute_energy(frame),
            f0_hz: self.pitch_estimator.estimate(frame),
            centroid_hz: self.spectral_features.compute_centroid(&spectrum),
            zcr: self.temporal_features.compute_zcr(frame),
            timestamp_ms,
        }
    }
}
