// CaptureEngine - cpal input stream feeding the buffer pool
//
// The capture callback runs on the real-time audio thread: it pops a
// recycled buffer from the pool, de-interleaves the first channel into it
// and pushes it onto the data queue. No allocation, no locks, no blocking.
// When the pool is exhausted the callback discards the block and bumps the
// shared drop counter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info, warn};

use super::buffer_pool::CaptureThreadChannels;
use crate::error::DetectorError;

/// Name and default-flag of an available input device.
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List input devices on the default host.
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>, DetectorError> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| DetectorError::StreamOpenFailed {
            reason: format!("Failed to enumerate input devices: {}", e),
        })?;

    let mut infos = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            let is_default = default_name.as_deref() == Some(name.as_str());
            infos.push(InputDeviceInfo { name, is_default });
        }
    }
    Ok(infos)
}

/// Owns the cpal input stream.
pub struct CaptureEngine {
    input_stream: Option<cpal::Stream>,
    /// Set by the stream error callback when the device goes away
    device_lost: Arc<AtomicBool>,
    /// Sample rate the stream actually opened with
    stream_sample_rate: u32,
}

impl CaptureEngine {
    pub fn new() -> Self {
        Self {
            input_stream: None,
            device_lost: Arc::new(AtomicBool::new(false)),
            stream_sample_rate: 0,
        }
    }

    pub fn device_lost_ref(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.device_lost)
    }

    /// Sample rate of the opened stream. 0 before `start`.
    pub fn sample_rate(&self) -> u32 {
        self.stream_sample_rate
    }

    fn find_device(device_name: Option<&str>) -> Result<cpal::Device, DetectorError> {
        let host = cpal::default_host();
        match device_name {
            Some(name) => {
                let mut devices =
                    host.input_devices()
                        .map_err(|e| DetectorError::StreamOpenFailed {
                            reason: format!("Failed to enumerate input devices: {}", e),
                        })?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| DetectorError::DeviceNotFound {
                        name: name.to_string(),
                    })
            }
            None => host
                .default_input_device()
                .ok_or_else(|| DetectorError::StreamOpenFailed {
                    reason: "No default input device found".to_string(),
                }),
        }
    }

    /// Open the input stream and start delivering buffers.
    ///
    /// `requested_sample_rate` is tried first; if the device refuses it the
    /// device default config is used and the caller must read back
    /// [`sample_rate`](Self::sample_rate).
    pub fn start(
        &mut self,
        device_name: Option<&str>,
        requested_sample_rate: u32,
        mut channels: CaptureThreadChannels,
    ) -> Result<(), DetectorError> {
        if self.input_stream.is_some() {
            return Err(DetectorError::AlreadyRunning);
        }

        let device = Self::find_device(device_name)?;
        let device_label = device.name().unwrap_or_else(|_| "<unnamed>".to_string());

        let default_config =
            device
                .default_input_config()
                .map_err(|e| DetectorError::StreamOpenFailed {
                    reason: format!("Failed to get default input config: {:?}", e),
                })?;

        if default_config.sample_format() != cpal::SampleFormat::F32 {
            return Err(DetectorError::StreamOpenFailed {
                reason: "Only F32 sample format is currently supported for input".to_string(),
            });
        }

        let mut stream_config: cpal::StreamConfig = default_config.clone().into();
        let supported_range = device.supported_input_configs().ok().and_then(|mut cfgs| {
            cfgs.find(|c| {
                c.sample_format() == cpal::SampleFormat::F32
                    && c.min_sample_rate().0 <= requested_sample_rate
                    && c.max_sample_rate().0 >= requested_sample_rate
            })
        });
        if supported_range.is_some() {
            stream_config.sample_rate = cpal::SampleRate(requested_sample_rate);
        } else {
            warn!(
                "Device '{}' does not support {} Hz, using device default {} Hz",
                device_label, requested_sample_rate, stream_config.sample_rate.0
            );
        }
        self.stream_sample_rate = stream_config.sample_rate.0;

        let channels_count = stream_config.channels as usize;
        let device_lost = Arc::clone(&self.device_lost);
        let err_fn = move |err: cpal::StreamError| {
            error!("Input stream error: {}", err);
            device_lost.store(true, Ordering::Release);
        };

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    match channels.pool_consumer.pop() {
                        Ok(mut buffer) => {
                            buffer.clear();
                            if channels_count == 1 {
                                buffer.extend_from_slice(data);
                            } else {
                                // De-interleave: take first channel
                                for frame in data.chunks(channels_count) {
                                    buffer.push(frame.first().copied().unwrap_or(0.0));
                                }
                            }
                            if channels.data_producer.push(buffer).is_err() {
                                channels.drops.record_drop();
                            }
                        }
                        Err(_) => {
                            // Detection thread fell behind; discard, never block.
                            channels.drops.record_drop();
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| DetectorError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })?;

        stream.play().map_err(|e| DetectorError::StreamOpenFailed {
            reason: format!("Input start failed: {}", e),
        })?;

        info!(
            "Capture started on '{}' at {} Hz ({} channel(s))",
            device_label, self.stream_sample_rate, channels_count
        );

        self.input_stream = Some(stream);
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(stream) = self.input_stream.take() {
            drop(stream);
            info!("Capture stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.input_stream.is_some()
    }
}

impl Default for CaptureEngine {
    fn default() -> Self {
        Self::new()
    }
}
