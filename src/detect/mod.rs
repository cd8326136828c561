// Detect module - frame classification through notification gating
//
// This module orchestrates the detection pipeline, consuming capture
// buffers from the data queue and driving the mute gate.
//
// Architecture:
// - DetectionPipeline: BandFilter -> FeatureExtractor -> classify_frame
//   -> DurationValidator -> PeriodicityValidator -> NotificationGate
// - DetectionWorker: loop that feeds the pipeline from the buffer pool
// - Output: DetectionEvents via the telemetry hub, mute commands via the
//   configured ControlSink
//
// Time inside the pipeline is derived from the processed sample count, so
// identical input always produces identical timestamps and decisions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::warn;
use rtrb::PopError;

pub mod classifier;
pub mod duration;
pub mod gate;
pub mod periodicity;

pub use classifier::classify_frame;
pub use duration::{CandidateEvent, DurationValidator};
pub use gate::{ControlSink, MuteCommand, NotificationGate};
pub use periodicity::PeriodicityValidator;

use crate::audio::buffer_pool::DetectionThreadChannels;
use crate::audio::AudioBlock;
use crate::config::{AudioConfig, ConfigHandle};
use crate::dsp::{BandFilter, FeatureExtractor, ANALYSIS_WINDOW, HOP_SIZE};
use crate::telemetry;

/// Snore band lower edge in Hz
const BAND_LOW_HZ: f32 = 80.0;
/// Snore band upper edge in Hz
const BAND_HIGH_HZ: f32 = 1600.0;

/// The full detection chain from raw samples to mute commands.
///
/// Online capture and offline file analysis share this type; the only
/// difference is who calls [`push_samples`](Self::push_samples).
pub struct DetectionPipeline {
    config: ConfigHandle,
    filter: BandFilter,
    extractor: FeatureExtractor,
    duration: DurationValidator,
    periodicity: PeriodicityValidator,
    gate: NotificationGate,

    sample_rate: u32,
    block_size: usize,
    /// Raw samples waiting to fill the next fixed-size block
    pending: Vec<f32>,
    /// Band-limited samples waiting to fill the next analysis frame
    filtered: Vec<f32>,
    /// Samples consumed into blocks since session start
    consumed_samples: u64,
    /// Analysis frames emitted since session start
    frames_emitted: u64,
    /// Last mute state published to telemetry
    published_muted: bool,
}

impl DetectionPipeline {
    pub fn new(audio: &AudioConfig, config: ConfigHandle, sink: Box<dyn ControlSink + Send>) -> Self {
        Self {
            config,
            filter: BandFilter::new(
                audio.sample_rate,
                BAND_LOW_HZ,
                BAND_HIGH_HZ,
                audio.block_size,
            ),
            extractor: FeatureExtractor::new(audio.sample_rate),
            duration: DurationValidator::new(),
            periodicity: PeriodicityValidator::new(),
            gate: NotificationGate::new(sink),
            sample_rate: audio.sample_rate,
            block_size: audio.block_size,
            pending: Vec::with_capacity(audio.block_size * 2),
            filtered: Vec::with_capacity(ANALYSIS_WINDOW * 2),
            consumed_samples: 0,
            frames_emitted: 0,
            published_muted: false,
        }
    }

    /// Current pipeline time in ms, derived from consumed samples.
    pub fn now_ms(&self) -> u64 {
        self.consumed_samples * 1000 / self.sample_rate as u64
    }

    pub fn is_muted(&self) -> bool {
        self.gate.is_muted()
    }

    /// Feed captured samples through the whole chain.
    pub fn push_samples(&mut self, samples: &[f32]) {
        self.pending.extend_from_slice(samples);

        while self.pending.len() >= self.block_size {
            let samples: Vec<f32> = self.pending.drain(..self.block_size).collect();
            let mut block = AudioBlock::new(samples, self.now_ms(), self.sample_rate);
            self.consumed_samples += self.block_size as u64;

            match self.filter.process(&mut block.samples) {
                Ok(()) => self.filtered.extend_from_slice(&block.samples),
                Err(err) => {
                    // Block length is fixed above, so this is unreachable in
                    // practice; degrade by skipping the block.
                    warn!("[Detect] {}", err);
                    telemetry::hub().record_error(err.to_string());
                }
            }
        }

        while self.filtered.len() >= ANALYSIS_WINDOW {
            self.process_frame();
            self.filtered.drain(..HOP_SIZE);
            self.frames_emitted += 1;
        }
    }

    fn process_frame(&mut self) {
        let frame_start_sample = self.frames_emitted * HOP_SIZE as u64;
        let timestamp_ms = frame_start_sample * 1000 / self.sample_rate as u64;

        // One consistent snapshot per frame; a concurrent update applies
        // from the next frame on.
        let config = self.config.snapshot();

        let features = self
            .extractor
            .extract(&self.filtered[..ANALYSIS_WINDOW], timestamp_ms);
        let snore_like = classify_frame(&features, &config);
        telemetry::hub().record_frame(&features, snore_like);

        if let Some(candidate) = self.duration.observe(snore_like, timestamp_ms, &config) {
            telemetry::hub().record_candidate(&candidate);
            if self.periodicity.observe(&candidate, &config) {
                // The confirmation is stamped with the event end, not the
                // (slightly later) frame that closed the run.
                telemetry::hub()
                    .record_confirmed(candidate.end_ms, self.periodicity.events_in_window());
                self.gate.on_confirmed(candidate.end_ms);
            }
        }

        self.periodicity.prune(timestamp_ms, &config);
        self.gate.evaluate(timestamp_ms, &config);
        self.publish_mute_change(timestamp_ms);
    }

    /// Tick the gate without new audio, e.g. while the queue is empty.
    pub fn tick(&mut self) {
        let now_ms = self.now_ms();
        let config = self.config.snapshot();
        self.gate.evaluate(now_ms, &config);
        self.publish_mute_change(now_ms);
    }

    /// Tear down at session end: discard the open run, forget the
    /// periodicity history and drive the remote back to unmuted.
    pub fn finish(&mut self) {
        self.duration.reset();
        self.periodicity.clear();
        self.gate.force_unmute();
        self.publish_mute_change(self.now_ms());
    }

    fn publish_mute_change(&mut self, now_ms: u64) {
        let muted = self.gate.is_muted();
        if muted != self.published_muted {
            self.published_muted = muted;
            telemetry::hub().record_mute_change(muted, now_ms);
        }
    }
}

/// Consumes capture buffers and feeds them through the pipeline.
struct DetectionWorker {
    channels: DetectionThreadChannels,
    pipeline: DetectionPipeline,
    shutdown: Arc<AtomicBool>,
}

impl DetectionWorker {
    fn run(mut self) {
        tracing::info!("[DetectThread] Starting detection loop");

        loop {
            let buffer = match self.channels.data_consumer.pop() {
                Ok(buf) => buf,
                Err(PopError::Empty) => {
                    // Check shutdown only when the queue is drained
                    if self.shutdown.load(Ordering::Acquire) {
                        tracing::info!("[DetectThread] Shutdown requested and queue empty, exiting");
                        break;
                    }
                    self.pipeline.tick();
                    thread::sleep(Duration::from_millis(1));
                    continue;
                }
            };

            self.pipeline.push_samples(&buffer);
            telemetry::hub().record_drop_total(self.channels.drops.count());

            // Return the buffer to the pool immediately
            let mut buffer = buffer;
            buffer.clear();
            if self.channels.pool_producer.push(buffer).is_err() {
                tracing::warn!("[DetectThread] Pool queue full, dropping buffer");
            }
        }

        self.pipeline.finish();
        tracing::info!("[DetectThread] Detection loop exited");
    }
}

/// Spawn the detection thread. It drains the data queue until `shutdown`
/// is set and the queue is empty, then unmutes and exits.
pub fn spawn_detection_thread(
    channels: DetectionThreadChannels,
    audio: &AudioConfig,
    config: ConfigHandle,
    sink: Box<dyn ControlSink + Send>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let pipeline = DetectionPipeline::new(audio, config, sink);
    let worker = DetectionWorker {
        channels,
        pipeline,
        shutdown,
    };

    thread::Builder::new()
        .name("snore-detect".to_string())
        .spawn(move || worker.run())
        .expect("Failed to spawn detection thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensitivityConfig;
    use crate::error::DetectorError;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<MuteCommand>>>,
    }

    impl ControlSink for RecordingSink {
        fn send(&mut self, command: MuteCommand) -> Result<(), DetectorError> {
            self.sent.lock().unwrap().push(command);
            Ok(())
        }
    }

    fn snore_burst(sample_rate: u32, duration_ms: u64, amplitude: f32) -> Vec<f32> {
        let samples = (sample_rate as u64 * duration_ms / 1000) as usize;
        (0..samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * 100.0 * t).sin()
            })
            .collect()
    }

    fn silence(sample_rate: u32, duration_ms: u64) -> Vec<f32> {
        vec![0.0; (sample_rate as u64 * duration_ms / 1000) as usize]
    }

    fn pipeline_with_sink() -> (DetectionPipeline, RecordingSink) {
        let sink = RecordingSink::default();
        let audio = AudioConfig::default();
        let config = ConfigHandle::default();
        let pipeline = DetectionPipeline::new(&audio, config, Box::new(sink.clone()));
        (pipeline, sink)
    }

    #[test]
    fn test_periodic_snoring_mutes_once() {
        let (mut pipeline, sink) = pipeline_with_sink();
        let fs = 16_000;

        // Four 1 s snore bursts separated by 8 s of quiet
        for _ in 0..4 {
            pipeline.push_samples(&snore_burst(fs, 1_000, 0.3));
            pipeline.push_samples(&silence(fs, 8_000));
        }

        assert!(pipeline.is_muted());
        assert_eq!(*sink.sent.lock().unwrap(), vec![MuteCommand::Mute]);
    }

    #[test]
    fn test_silence_never_mutes() {
        let (mut pipeline, sink) = pipeline_with_sink();

        pipeline.push_samples(&silence(16_000, 60_000));

        assert!(!pipeline.is_muted());
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_isolated_burst_does_not_mute() {
        let (mut pipeline, sink) = pipeline_with_sink();

        pipeline.push_samples(&snore_burst(16_000, 1_000, 0.3));
        pipeline.push_samples(&silence(16_000, 10_000));

        assert!(!pipeline.is_muted());
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_quiet_period_unmutes() {
        let (mut pipeline, sink) = pipeline_with_sink();
        let fs = 16_000;

        for _ in 0..4 {
            pipeline.push_samples(&snore_burst(fs, 1_000, 0.3));
            pipeline.push_samples(&silence(fs, 8_000));
        }
        assert!(pipeline.is_muted());

        let timeout = SensitivityConfig::default().silence_timeout_ms;
        pipeline.push_samples(&silence(fs, timeout + 1_000));

        assert!(!pipeline.is_muted());
        assert_eq!(
            *sink.sent.lock().unwrap(),
            vec![MuteCommand::Mute, MuteCommand::Unmute]
        );
    }

    #[test]
    fn test_finish_forces_unmute() {
        let (mut pipeline, sink) = pipeline_with_sink();
        let fs = 16_000;

        for _ in 0..4 {
            pipeline.push_samples(&snore_burst(fs, 1_000, 0.3));
            pipeline.push_samples(&silence(fs, 8_000));
        }
        assert!(pipeline.is_muted());

        pipeline.finish();
        assert!(!pipeline.is_muted());
        assert_eq!(sink.sent.lock().unwrap().last(), Some(&MuteCommand::Unmute));
    }

    #[test]
    fn test_finish_without_mute_sends_nothing() {
        let (mut pipeline, sink) = pipeline_with_sink();

        pipeline.push_samples(&silence(16_000, 5_000));
        pipeline.tick();
        pipeline.finish();

        assert!(!pipeline.is_muted());
        assert!(sink.sent.lock().unwrap().is_empty());
    }
}
