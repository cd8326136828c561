// End-to-end pipeline tests over synthesized audio.
//
// All audio is generated: snore bursts are low-frequency tones at
// breathing-cycle spacing, interference is white noise or tones outside the
// snore profile. Time advances with the samples, so every test is
// deterministic.

use std::sync::{Arc, Mutex};

use rand::Rng;

use snoreguard::config::{AudioConfig, ConfigHandle, SensitivityConfig};
use snoreguard::detect::{ControlSink, DetectionPipeline, MuteCommand};
use snoreguard::error::DetectorError;

const SAMPLE_RATE: u32 = 16_000;

/// Records every send; optionally fails the first N of them.
#[derive(Clone, Default)]
struct TestSink {
    sent: Arc<Mutex<Vec<MuteCommand>>>,
    failures_left: Arc<Mutex<u32>>,
}

impl TestSink {
    fn sent(&self) -> Vec<MuteCommand> {
        self.sent.lock().unwrap().clone()
    }
}

impl ControlSink for TestSink {
    fn send(&mut self, command: MuteCommand) -> Result<(), DetectorError> {
        let mut failures = self.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(DetectorError::Transport {
                reason: "simulated outage".to_string(),
            });
        }
        self.sent.lock().unwrap().push(command);
        Ok(())
    }
}

fn tone(frequency: f32, amplitude: f32, duration_ms: u64) -> Vec<f32> {
    let samples = (SAMPLE_RATE as u64 * duration_ms / 1000) as usize;
    (0..samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

fn snore_burst(duration_ms: u64) -> Vec<f32> {
    tone(100.0, 0.3, duration_ms)
}

fn silence(duration_ms: u64) -> Vec<f32> {
    vec![0.0; (SAMPLE_RATE as u64 * duration_ms / 1000) as usize]
}

fn white_noise(amplitude: f32, duration_ms: u64) -> Vec<f32> {
    let samples = (SAMPLE_RATE as u64 * duration_ms / 1000) as usize;
    let mut rng = rand::thread_rng();
    (0..samples)
        .map(|_| rng.gen_range(-amplitude..amplitude))
        .collect()
}

fn build_pipeline(config: SensitivityConfig) -> (DetectionPipeline, TestSink, ConfigHandle) {
    let sink = TestSink::default();
    let handle = ConfigHandle::new(config).unwrap();
    let pipeline = DetectionPipeline::new(
        &AudioConfig::default(),
        handle.clone(),
        Box::new(sink.clone()),
    );
    (pipeline, sink, handle)
}

fn feed_snoring_episode(pipeline: &mut DetectionPipeline, bursts: usize) {
    for _ in 0..bursts {
        pipeline.push_samples(&snore_burst(1_000));
        pipeline.push_samples(&silence(8_000));
    }
}

#[test]
fn periodic_snoring_mutes_exactly_once() {
    let (mut pipeline, sink, _) = build_pipeline(SensitivityConfig::default());

    // Six breathing cycles; confirmation lands on the fourth and the rest
    // only refresh the timer
    feed_snoring_episode(&mut pipeline, 6);

    assert!(pipeline.is_muted());
    assert_eq!(sink.sent(), vec![MuteCommand::Mute]);
}

#[test]
fn silence_produces_no_commands() {
    let (mut pipeline, sink, _) = build_pipeline(SensitivityConfig::default());

    pipeline.push_samples(&silence(120_000));

    assert!(!pipeline.is_muted());
    assert!(sink.sent().is_empty());
}

#[test]
fn loud_broadband_noise_is_not_snoring() {
    let (mut pipeline, sink, _) = build_pipeline(SensitivityConfig::default());

    // Plenty of energy, but wrong pitch, centroid and ZCR
    for _ in 0..6 {
        pipeline.push_samples(&white_noise(0.5, 1_000));
        pipeline.push_samples(&silence(8_000));
    }

    assert!(!pipeline.is_muted());
    assert!(sink.sent().is_empty());
}

#[test]
fn short_bursts_fail_the_duration_minimum() {
    let (mut pipeline, sink, _) = build_pipeline(SensitivityConfig::default());

    // 100 ms pops, well under the 200 ms minimum, at snoring cadence
    for _ in 0..8 {
        pipeline.push_samples(&snore_burst(100));
        pipeline.push_samples(&silence(8_000));
    }

    assert!(!pipeline.is_muted());
    assert!(sink.sent().is_empty());
}

#[test]
fn sustained_tone_fails_the_duration_maximum() {
    let (mut pipeline, sink, _) = build_pipeline(SensitivityConfig::default());

    // A machine hum with a snore-like spectrum, 8 s per stretch
    for _ in 0..6 {
        pipeline.push_samples(&tone(100.0, 0.3, 8_000));
        pipeline.push_samples(&silence(2_000));
    }

    assert!(!pipeline.is_muted());
    assert!(sink.sent().is_empty());
}

#[test]
fn sparse_events_never_confirm() {
    let (mut pipeline, sink, _) = build_pipeline(SensitivityConfig::default());

    // Valid bursts, but one per minute against a 45 s window
    for _ in 0..5 {
        pipeline.push_samples(&snore_burst(1_000));
        pipeline.push_samples(&silence(59_000));
    }

    assert!(!pipeline.is_muted());
    assert!(sink.sent().is_empty());
}

#[test]
fn quiet_stretch_after_snoring_unmutes() {
    let config = SensitivityConfig::default();
    let timeout = config.silence_timeout_ms;
    let (mut pipeline, sink, _) = build_pipeline(config);

    feed_snoring_episode(&mut pipeline, 4);
    assert!(pipeline.is_muted());

    pipeline.push_samples(&silence(timeout + 2_000));

    assert!(!pipeline.is_muted());
    assert_eq!(sink.sent(), vec![MuteCommand::Mute, MuteCommand::Unmute]);
}

#[test]
fn snoring_resuming_after_unmute_mutes_again() {
    let config = SensitivityConfig::default();
    let timeout = config.silence_timeout_ms;
    let (mut pipeline, sink, _) = build_pipeline(config);

    feed_snoring_episode(&mut pipeline, 4);
    pipeline.push_samples(&silence(timeout + 2_000));
    assert!(!pipeline.is_muted());

    // The old events are far outside the window; a fresh episode is needed
    feed_snoring_episode(&mut pipeline, 4);

    assert!(pipeline.is_muted());
    assert_eq!(
        sink.sent(),
        vec![MuteCommand::Mute, MuteCommand::Unmute, MuteCommand::Mute]
    );
}

#[test]
fn transport_outage_heals_without_losing_the_mute() {
    let (mut pipeline, sink, _) = build_pipeline(SensitivityConfig::default());
    *sink.failures_left.lock().unwrap() = 3;

    feed_snoring_episode(&mut pipeline, 4);

    // The first sends failed, but subsequent frames retried
    assert!(pipeline.is_muted());
    assert_eq!(sink.sent(), vec![MuteCommand::Mute]);
}

#[test]
fn sensitivity_update_applies_to_later_frames() {
    let (mut pipeline, sink, handle) = build_pipeline(SensitivityConfig::default());

    // Strict sensitivity doubles the effective energy bar; a borderline
    // burst no longer classifies
    let strict = SensitivityConfig {
        sensitivity: 0.0,
        ..SensitivityConfig::default()
    };
    handle.update(strict).unwrap();

    for _ in 0..6 {
        pipeline.push_samples(&tone(100.0, 0.028, 1_000));
        pipeline.push_samples(&silence(8_000));
    }
    assert!(!pipeline.is_muted());

    // Back to neutral, the same borderline burst confirms
    handle.update(SensitivityConfig::default()).unwrap();
    for _ in 0..6 {
        pipeline.push_samples(&tone(100.0, 0.028, 1_000));
        pipeline.push_samples(&silence(8_000));
    }

    assert!(pipeline.is_muted());
    assert_eq!(sink.sent(), vec![MuteCommand::Mute]);
}

#[test]
fn rejected_update_leaves_detection_running_on_old_config() {
    let (mut pipeline, sink, handle) = build_pipeline(SensitivityConfig::default());

    let invalid = SensitivityConfig {
        zcr_range: [0.8, 0.2],
        ..SensitivityConfig::default()
    };
    assert!(matches!(
        handle.update(invalid),
        Err(DetectorError::ConfigOutOfRange { .. })
    ));

    feed_snoring_episode(&mut pipeline, 4);
    assert!(pipeline.is_muted());
    assert_eq!(sink.sent(), vec![MuteCommand::Mute]);
}

#[test]
fn never_muted_run_produces_no_traffic_on_finish() {
    let (mut pipeline, sink, _) = build_pipeline(SensitivityConfig::default());

    pipeline.push_samples(&silence(10_000));
    pipeline.tick();
    pipeline.finish();

    assert!(!pipeline.is_muted());
    assert!(sink.sent().is_empty());
}

#[test]
fn finish_discards_state_and_unmutes() {
    let (mut pipeline, sink, _) = build_pipeline(SensitivityConfig::default());

    feed_snoring_episode(&mut pipeline, 4);
    assert!(pipeline.is_muted());

    pipeline.finish();

    assert!(!pipeline.is_muted());
    assert_eq!(sink.sent(), vec![MuteCommand::Mute, MuteCommand::Unmute]);

    // A single burst after the reset must not re-confirm from stale history
    pipeline.push_samples(&snore_burst(1_000));
    pipeline.push_samples(&silence(8_000));
    assert!(!pipeline.is_muted());
}
