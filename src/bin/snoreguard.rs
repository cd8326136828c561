use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use snoreguard::audio::list_input_devices;
use snoreguard::config::{AppConfig, AudioConfig};
use snoreguard::detect::{ControlSink, DetectionPipeline, MuteCommand};
use snoreguard::error::DetectorError;
use snoreguard::session::DetectionSession;
use snoreguard::telemetry::{self, DetectionEvent};

#[derive(Parser, Debug)]
#[command(
    name = "snoreguard",
    about = "Real-time snore detection with OSC mute control"
)]
struct Cli {
    /// Path to a JSON config file (defaults are used when absent)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available audio input devices
    ListDevices,
    /// Run live detection until Ctrl-C
    Run {
        /// Input device name (default input device when omitted)
        #[arg(long)]
        device: Option<String>,
        /// Override the master sensitivity in [0, 1]
        #[arg(long)]
        sensitivity: Option<f32>,
    },
    /// Run the detection chain over a WAV file and print a report
    Analyze {
        /// Path to a mono or multi-channel WAV file
        wav: PathBuf,
        /// Emit every pipeline event as a JSON line before the report
        #[arg(long)]
        events: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::ListDevices => run_list_devices(),
        Commands::Run {
            device,
            sensitivity,
        } => run_live(config, device.as_deref(), sensitivity),
        Commands::Analyze { wav, events } => run_analyze(config, &wav, events),
    }
}

fn run_list_devices() -> Result<ExitCode> {
    let devices = list_input_devices().context("enumerating input devices")?;
    if devices.is_empty() {
        println!("No input devices found");
        return Ok(ExitCode::from(0));
    }

    for device in devices {
        if device.is_default {
            println!("{} (default)", device.name);
        } else {
            println!("{}", device.name);
        }
    }
    Ok(ExitCode::from(0))
}

fn run_live(
    mut config: AppConfig,
    device: Option<&str>,
    sensitivity: Option<f32>,
) -> Result<ExitCode> {
    if let Some(value) = sensitivity {
        config.sensitivity.sensitivity = value;
    }

    let mut session = DetectionSession::new(config).context("building detection session")?;
    let mut events = telemetry::hub().collector().subscribe();
    session.start(device).context("starting capture")?;
    println!("Detection running, Ctrl-C to stop");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building async runtime")?;

    let exit = runtime.block_on(async {
        let mut device_poll = tokio::time::interval(Duration::from_millis(500));
        loop {
            tokio::select! {
                event = events.recv() => {
                    if let Ok(event) = event {
                        println!("{}", serde_json::to_string(&event)?);
                    }
                }
                _ = device_poll.tick() => {
                    if let Err(DetectorError::DeviceLost { reason }) = session.check_device() {
                        eprintln!("Input device lost: {reason}");
                        break Ok::<ExitCode, anyhow::Error>(ExitCode::from(2));
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    break Ok(ExitCode::from(0));
                }
            }
        }
    })?;

    session.stop().context("stopping session")?;
    Ok(exit)
}

/// Sink that records mute transitions with no remote endpoint.
#[derive(Clone, Default)]
struct RecordingSink {
    commands: Arc<Mutex<Vec<MuteCommand>>>,
}

impl ControlSink for RecordingSink {
    fn send(&mut self, command: MuteCommand) -> Result<(), DetectorError> {
        self.commands
            .lock()
            .expect("sink lock poisoned")
            .push(command);
        Ok(())
    }
}

#[derive(Serialize)]
struct AnalyzeReport {
    wav: String,
    sample_rate: u32,
    duration_ms: u64,
    candidates: usize,
    confirmations: usize,
    ended_muted: bool,
}

fn run_analyze(config: AppConfig, wav_path: &PathBuf, emit_events: bool) -> Result<ExitCode> {
    let mut reader = hound::WavReader::open(wav_path)
        .with_context(|| format!("opening {}", wav_path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    // First channel only, normalized to [-1, 1]
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .step_by(channels)
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .step_by(channels)
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    // Keep frame durations stable regardless of the file's sample rate
    let audio = AudioConfig {
        sample_rate: spec.sample_rate,
        block_size: (config.audio.block_size as u64 * spec.sample_rate as u64
            / config.audio.sample_rate as u64) as usize,
        ..config.audio
    };
    let sensitivity = snoreguard::config::ConfigHandle::new(config.sensitivity.clone())
        .context("validating sensitivity config")?;

    telemetry::hub().reset_session_state();
    let sink = RecordingSink::default();
    let mut pipeline = DetectionPipeline::new(&audio, sensitivity, Box::new(sink.clone()));

    pipeline.push_samples(&samples);
    let duration_ms = pipeline.now_ms();
    let ended_muted = pipeline.is_muted();
    pipeline.finish();

    let snapshot = telemetry::hub().snapshot();
    if emit_events {
        for event in &snapshot.recent {
            println!("{}", serde_json::to_string(event)?);
        }
    }

    let report = AnalyzeReport {
        wav: wav_path.display().to_string(),
        sample_rate: spec.sample_rate,
        duration_ms,
        candidates: snapshot
            .recent
            .iter()
            .filter(|e| matches!(e, DetectionEvent::CandidateDetected { .. }))
            .count(),
        confirmations: snapshot
            .recent
            .iter()
            .filter(|e| matches!(e, DetectionEvent::SnoringConfirmed { .. }))
            .count(),
        ended_muted,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.confirmations > 0 {
        ExitCode::from(0)
    } else {
        ExitCode::from(3)
    })
}
