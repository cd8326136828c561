// DetectionSession - lifecycle of one capture-plus-detection run
//
// Owns the capture engine, the buffer pool and the detection thread.
// start() wires them together, stop() tears them down in order: capture
// first so no new buffers arrive, then the detection thread drains the
// queue, unmutes and exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info, warn};

use crate::audio::{BufferPool, CaptureEngine};
use crate::config::{AppConfig, ConfigHandle};
use crate::detect::{spawn_detection_thread, ControlSink};
use crate::error::DetectorError;
use crate::osc::OscSink;
use crate::telemetry;

/// One start/stop cycle of the detector.
pub struct DetectionSession {
    app_config: AppConfig,
    sensitivity: ConfigHandle,
    capture: Option<CaptureEngine>,
    detect_handle: Option<JoinHandle<()>>,
    shutdown: Option<Arc<AtomicBool>>,
}

impl DetectionSession {
    pub fn new(app_config: AppConfig) -> Result<Self, DetectorError> {
        let sensitivity = ConfigHandle::new(app_config.sensitivity.clone())?;
        Ok(Self {
            app_config,
            sensitivity,
            capture: None,
            detect_handle: None,
            shutdown: None,
        })
    }

    /// Handle for live sensitivity updates while the session runs.
    pub fn sensitivity(&self) -> ConfigHandle {
        self.sensitivity.clone()
    }

    pub fn is_running(&self) -> bool {
        self.capture.is_some()
    }

    /// Start capture and detection on the given input device (or the
    /// default device when `None`), muting through OSC.
    pub fn start(&mut self, device_name: Option<&str>) -> Result<(), DetectorError> {
        let sink = OscSink::new(&self.app_config.notify)?;
        self.start_with_sink(device_name, Box::new(sink))
    }

    /// Start with an explicit control sink; used by tests and embeddings
    /// that bring their own transport.
    pub fn start_with_sink(
        &mut self,
        device_name: Option<&str>,
        sink: Box<dyn ControlSink + Send>,
    ) -> Result<(), DetectorError> {
        if self.is_running() {
            return Err(DetectorError::AlreadyRunning);
        }

        let audio = &self.app_config.audio;
        let channels = BufferPool::new(audio.buffer_pool_size, audio.buffer_size);
        let (capture_channels, detect_channels) = channels.split_for_threads();

        let mut capture = CaptureEngine::new();
        capture.start(device_name, audio.sample_rate, capture_channels)?;

        // The device may have refused the requested rate; keep the frame
        // duration stable by scaling the block size with the actual rate.
        let actual_rate = capture.sample_rate();
        let mut detect_audio = audio.clone();
        if actual_rate != audio.sample_rate {
            warn!(
                "[Session] Capture opened at {} Hz instead of {} Hz",
                actual_rate, audio.sample_rate
            );
            detect_audio.block_size =
                (audio.block_size as u64 * actual_rate as u64 / audio.sample_rate as u64) as usize;
            detect_audio.sample_rate = actual_rate;
        }

        telemetry::hub().reset_session_state();

        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = spawn_detection_thread(
            detect_channels,
            &detect_audio,
            self.sensitivity.clone(),
            sink,
            Arc::clone(&shutdown),
        );

        info!("[Session] Detection session started");
        self.capture = Some(capture);
        self.detect_handle = Some(handle);
        self.shutdown = Some(shutdown);
        Ok(())
    }

    /// Check the capture stream; returns `DeviceLost` if its error
    /// callback fired. Callers should stop the session on that error.
    pub fn check_device(&self) -> Result<(), DetectorError> {
        match &self.capture {
            Some(capture) if capture.device_lost_ref().load(Ordering::Acquire) => {
                Err(DetectorError::DeviceLost {
                    reason: "Input stream reported an error".to_string(),
                })
            }
            Some(_) => Ok(()),
            None => Err(DetectorError::NotRunning),
        }
    }

    /// Stop capture, drain the detection thread and unmute.
    pub fn stop(&mut self) -> Result<(), DetectorError> {
        if !self.is_running() {
            return Err(DetectorError::NotRunning);
        }

        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.store(true, Ordering::Release);
        }
        if let Some(handle) = self.detect_handle.take() {
            if handle.join().is_err() {
                error!("[Session] Detection thread panicked during shutdown");
            }
        }

        info!("[Session] Detection session stopped");
        Ok(())
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}
