// BandFilter - Butterworth band-pass limiting the signal to the snore band
//
// Implemented as a cascade of biquad sections: a 4th-order high-pass at the
// low cutoff followed by a 4th-order low-pass at the high cutoff. Filter
// state carries across blocks so there is no discontinuity at block
// boundaries.
//
// Coefficients follow the Audio EQ Cookbook (R. Bristow-Johnson); the Q
// pairing (0.5412, 1.3066) makes each cascaded pair a 4th-order Butterworth
// response.

use crate::error::DetectorError;

/// Butterworth Q values for a 4th-order two-section cascade
const BUTTERWORTH_Q4: [f32; 2] = [0.541_196, 1.306_563];

/// One Direct Form II transposed biquad section.
#[derive(Debug, Clone)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    fn low_pass(sample_rate: f32, cutoff_hz: f32, q: f32) -> Self {
        let omega = 2.0 * std::f32::consts::PI * cutoff_hz / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * q);

        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 - cos_w) / 2.0) / a0,
            b1: (1.0 - cos_w) / a0,
            b2: ((1.0 - cos_w) / 2.0) / a0,
            a1: (-2.0 * cos_w) / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    fn high_pass(sample_rate: f32, cutoff_hz: f32, q: f32) -> Self {
        let omega = 2.0 * std::f32::consts::PI * cutoff_hz / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * q);

        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 + cos_w) / 2.0) / a0,
            b1: (-(1.0 + cos_w)) / a0,
            b2: ((1.0 + cos_w) / 2.0) / a0,
            a1: (-2.0 * cos_w) / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    fn process_sample(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Band-pass filter restricting input audio to the snore frequency band.
pub struct BandFilter {
    sections: Vec<Biquad>,
    expected_block_size: usize,
}

impl BandFilter {
    /// Create a band-pass for `[low_cut_hz, high_cut_hz]`.
    ///
    /// `expected_block_size` is the fixed block length the filter accepts;
    /// blocks of any other length are rejected with `InvalidBlock`.
    pub fn new(
        sample_rate: u32,
        low_cut_hz: f32,
        high_cut_hz: f32,
        expected_block_size: usize,
    ) -> Self {
        let fs = sample_rate as f32;
        let mut sections = Vec::with_capacity(4);
        for q in BUTTERWORTH_Q4 {
            sections.push(Biquad::high_pass(fs, low_cut_hz, q));
        }
        for q in BUTTERWORTH_Q4 {
            sections.push(Biquad::low_pass(fs, high_cut_hz, q));
        }

        Self {
            sections,
            expected_block_size,
        }
    }

    /// Filter one block in place. State persists to the next block.
    pub fn process(&mut self, samples: &mut [f32]) -> Result<(), DetectorError> {
        if samples.len() != self.expected_block_size {
            return Err(DetectorError::InvalidBlock {
                expected: self.expected_block_size,
                actual: samples.len(),
            });
        }

        for sample in samples.iter_mut() {
            let mut y = *sample;
            for section in self.sections.iter_mut() {
                y = section.process_sample(y);
            }
            *sample = y;
        }
        Ok(())
    }

    /// Clear filter state, e.g. when a new session starts.
    pub fn reset(&mut self) {
        for section in self.sections.iter_mut() {
            section.reset();
        }
    }
}
