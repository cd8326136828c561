// Pitch module - fundamental frequency estimation
//
// Snoring carries a low fundamental from tissue vibration, typically well
// under 200 Hz. Estimation uses normalized autocorrelation over a fixed
// physical search band; the classifier later decides whether the estimate
// falls inside the configured snore band.

/// Lower bound of the f0 search band in Hz
pub const F0_SEARCH_MIN_HZ: f32 = 50.0;
/// Upper bound of the f0 search band in Hz
pub const F0_SEARCH_MAX_HZ: f32 = 300.0;

/// Correlation below this is treated as unvoiced
const VOICING_THRESHOLD: f32 = 0.30;
/// A lag correlating within this factor of the best counts as equivalent
const SUBHARMONIC_TOLERANCE: f32 = 0.9;
/// Frames quieter than this cannot carry a reliable pitch
const ENERGY_FLOOR: f32 = 1e-8;

/// Autocorrelation-based fundamental frequency estimator.
pub struct PitchEstimator {
    sample_rate: u32,
}

impl PitchEstimator {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Estimate f0 of `audio` in Hz. Returns `None` when the frame is
    /// unvoiced or too quiet.
    pub fn estimate(&self, audio: &[f32]) -> Option<f32> {
        let fs = self.sample_rate as f32;
        let min_lag = (fs / F0_SEARCH_MAX_HZ).floor() as usize;
        let max_lag = (fs / F0_SEARCH_MIN_HZ).ceil() as usize;

        // Need at least one full period of the lowest frequency plus the
        // comparison window.
        if audio.len() < max_lag * 2 || min_lag == 0 {
            return None;
        }

        let window = audio.len() - max_lag;
        let energy: f32 = audio[..window].iter().map(|&x| x * x).sum();
        if energy < ENERGY_FLOOR * window as f32 {
            return None;
        }

        let mut corrs = vec![0.0_f32; max_lag - min_lag + 1];
        let mut best_lag = 0;
        let mut best_corr = 0.0_f32;

        for lag in min_lag..=max_lag {
            let mut cross = 0.0_f32;
            let mut lagged_energy = 0.0_f32;
            for i in 0..window {
                cross += audio[i] * audio[i + lag];
                lagged_energy += audio[i + lag] * audio[i + lag];
            }

            let denom = (energy * lagged_energy).sqrt();
            if denom < 1e-12 {
                continue;
            }
            let corr = cross / denom;
            corrs[lag - min_lag] = corr;
            if corr > best_corr {
                best_corr = corr;
                best_lag = lag;
            }
        }

        if best_corr < VOICING_THRESHOLD || best_lag == 0 {
            return None;
        }

        // Multiples of the true period correlate within float noise of the
        // period itself, so the argmax can land an octave or more low.
        // Prefer the smallest submultiple lag that correlates almost as
        // well as the winner.
        let mut lag = best_lag;
        for div in 2..=(best_lag / min_lag).max(1) {
            let candidate = (best_lag as f32 / div as f32).round() as usize;
            if candidate < min_lag {
                break;
            }
            if corrs[candidate - min_lag] >= best_corr * SUBHARMONIC_TOLERANCE {
                lag = candidate;
            }
        }

        Some(fs / lag as f32)
    }
}
