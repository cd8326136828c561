// AudioBlock - one fixed-length unit of captured audio
//
// Blocks are produced by the framing step on the detection thread, stamped
// from the running count of consumed samples so timestamps are
// monotonically non-decreasing through the whole pipeline.

/// An immutable, fixed-length block of mono audio samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    /// Signed amplitude samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Capture time of the first sample, in ms since session start
    pub timestamp_ms: u64,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>, timestamp_ms: u64, sample_rate: u32) -> Self {
        Self {
            samples,
            timestamp_ms,
            sample_rate,
        }
    }

    /// Block duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}
