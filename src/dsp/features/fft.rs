// FFT module - magnitude spectrum computation
//
// Applies a pre-computed Hann window before the transform to reduce
// spectral leakage. The forward FFT is planned once at construction so the
// per-frame path does no planning work.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// FFT window size for feature extraction
pub const FFT_SIZE: usize = 1024;

/// Computes magnitude spectra from analysis frames.
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Hann window (pre-computed)
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl FftProcessor {
    pub fn new(fft_size: usize) -> Self {
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f32::consts::PI * i as f32) / (fft_size as f32 - 1.0)).cos())
            })
            .collect();

        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        Self {
            fft,
            fft_size,
            window,
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Compute the magnitude spectrum of `audio`.
    ///
    /// Input shorter than the FFT size is zero-padded; input longer is
    /// truncated. Returns `fft_size / 2 + 1` positive-frequency magnitudes.
    pub fn magnitude_spectrum(&mut self, audio: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = audio
            .iter()
            .take(self.fft_size)
            .enumerate()
            .map(|(i, &sample)| Complex::new(sample * self.window[i], 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process_with_scratch(&mut buffer, &mut self.scratch);

        buffer[..self.fft_size / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect()
    }
}
