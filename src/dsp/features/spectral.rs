// Spectral module - frequency-domain features
//
// Snore frames concentrate their energy low in the band, so the spectral
// centroid is the main frequency-domain discriminator against broadband
// noise like rustling or speech sibilants.

/// Frequency-domain feature computation.
pub struct SpectralFeatures {
    sample_rate: u32,
    fft_size: usize,
}

impl SpectralFeatures {
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        Self {
            sample_rate,
            fft_size,
        }
    }

    /// Compute spectral centroid (weighted mean frequency).
    ///
    /// Formula: centroid = Σ(f_i × |X[i]|) / Σ|X[i]|
    ///
    /// Returns 0.0 for an empty or silent spectrum.
    pub fn compute_centroid(&self, spectrum: &[f32]) -> f32 {
        let freq_bin_width = self.sample_rate as f32 / self.fft_size as f32;

        let weighted_sum: f32 = spectrum
            .iter()
            .enumerate()
            .map(|(i, &mag)| i as f32 * freq_bin_width * mag)
            .sum();

        let magnitude_sum: f32 = spectrum.iter().sum();

        if magnitude_sum > 1e-10 {
            weighted_sum / magnitude_sum
        } else {
            0.0
        }
    }
}
