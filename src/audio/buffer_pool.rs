// BufferPool - lock-free hand-off between the capture callback and the
// detection thread
//
// Two SPSC ring buffers circulate a fixed set of pre-allocated sample
// buffers so the real-time capture callback never allocates and never
// blocks:
//
// - DATA queue: capture thread pushes filled buffers, detection thread pops
// - POOL queue: detection thread returns drained buffers, capture recycles
//
// When the pool is exhausted (the detection thread has fallen behind and
// every buffer is in flight) the capture callback discards the incoming
// audio and increments the shared drop counter instead of blocking the
// audio device.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer};

/// Default number of hand-off buffers
pub const DEFAULT_BUFFER_COUNT: usize = 16;
/// Default hand-off buffer size in samples
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Pre-allocated mono sample buffer
pub type SampleBuffer = Vec<f32>;

/// Shared counter of capture blocks discarded on queue pressure.
#[derive(Clone, Default)]
pub struct DropCounter {
    dropped: Arc<AtomicU64>,
}

impl DropCounter {
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Queue endpoints owned by the capture (producer) side.
pub struct CaptureThreadChannels {
    pub data_producer: Producer<SampleBuffer>,
    pub pool_consumer: Consumer<SampleBuffer>,
    pub drops: DropCounter,
}

/// Queue endpoints owned by the detection (consumer) side.
pub struct DetectionThreadChannels {
    pub data_consumer: Consumer<SampleBuffer>,
    pub pool_producer: Producer<SampleBuffer>,
    pub drops: DropCounter,
}

/// All four queue endpoints, before the producer/consumer split.
pub struct BufferPoolChannels {
    pub data_producer: Producer<SampleBuffer>,
    pub data_consumer: Consumer<SampleBuffer>,
    pub pool_producer: Producer<SampleBuffer>,
    pub pool_consumer: Consumer<SampleBuffer>,
    pub drops: DropCounter,
}

impl BufferPoolChannels {
    /// Split the endpoints into the halves each thread owns.
    pub fn split_for_threads(self) -> (CaptureThreadChannels, DetectionThreadChannels) {
        let capture = CaptureThreadChannels {
            data_producer: self.data_producer,
            pool_consumer: self.pool_consumer,
            drops: self.drops.clone(),
        };
        let detection = DetectionThreadChannels {
            data_consumer: self.data_consumer,
            pool_producer: self.pool_producer,
            drops: self.drops,
        };
        (capture, detection)
    }
}

/// Lock-free buffer pool backed by dual SPSC ring buffers.
///
/// All heap allocation happens at construction; push/pop are wait-free,
/// which keeps the capture callback safe for the real-time audio thread.
pub struct BufferPool;

impl BufferPool {
    /// Create the pool with `buffer_count` buffers of `buffer_size` samples.
    ///
    /// # Panics
    /// Panics if either argument is 0.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(buffer_count: usize, buffer_size: usize) -> BufferPoolChannels {
        assert!(buffer_count > 0, "buffer_count must be greater than 0");
        assert!(buffer_size > 0, "buffer_size must be greater than 0");

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(buffer_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(buffer_count);

        for _ in 0..buffer_count {
            let buffer = Vec::with_capacity(buffer_size);
            pool_producer
                .push(buffer)
                .expect("Failed to seed pool queue during initialization");
        }

        BufferPoolChannels {
            data_producer,
            data_consumer,
            pool_producer,
            pool_consumer,
            drops: DropCounter::default(),
        }
    }
}
