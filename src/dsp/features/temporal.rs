// Temporal module - time-domain features
//
// Frame energy gates everything else in the classifier; zero-crossing rate
// separates the low-rumble snore texture from hissy broadband sounds.

/// Time-domain feature computation.
pub struct TemporalFeatures;

impl TemporalFeatures {
    pub fn new() -> Self {
        Self
    }

    /// Compute mean-square frame energy.
    ///
    /// Formula: energy = (1/N) × Σ x[n]²
    ///
    /// The value is amplitude squared, so an RMS amplitude threshold `t`
    /// corresponds to an energy threshold of `t²`.
    pub fn compute_energy(&self, audio: &[f32]) -> f32 {
        if audio.is_empty() {
            return 0.0;
        }
        audio.iter().map(|&x| x * x).sum::<f32>() / audio.len() as f32
    }

    /// Compute zero-crossing rate.
    ///
    /// Formula: ZCR = crossings / (N - 1)
    ///
    /// High ZCR indicates noise-like content, low ZCR tonal or
    /// low-frequency content.
    pub fn compute_zcr(&self, audio: &[f32]) -> f32 {
        if audio.len() < 2 {
            return 0.0;
        }

        let mut crossings = 0;
        for i in 1..audio.len() {
            if (audio[i] >= 0.0 && audio[i - 1] < 0.0) || (audio[i] < 0.0 && audio[i - 1] >= 0.0) {
                crossings += 1;
            }
        }

        crossings as f32 / (audio.len() - 1) as f32
    }
}

impl Default for TemporalFeatures {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_of_constant_signal() {
        let temporal = TemporalFeatures::new();
        let energy = temporal.compute_energy(&[0.5; 100]);
        assert!((energy - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_energy_of_silence_is_zero() {
        let temporal = TemporalFeatures::new();
        assert_eq!(temporal.compute_energy(&[0.0; 100]), 0.0);
        assert_eq!(temporal.compute_energy(&[]), 0.0);
    }

    #[test]
    fn test_zcr_alternating_signal() {
        let temporal = TemporalFeatures::new();
        let signal: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let zcr = temporal.compute_zcr(&signal);
        assert!((zcr - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zcr_dc_signal_is_zero() {
        let temporal = TemporalFeatures::new();
        assert_eq!(temporal.compute_zcr(&[0.3; 100]), 0.0);
    }
}
