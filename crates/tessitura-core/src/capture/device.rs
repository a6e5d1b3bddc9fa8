//! CPAL microphone capture.

use super::callback::{CallbackGuard, InputGain, PeakMeter};
use super::{CaptureDevice, RollingBuffer};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use std::sync::Arc;

/// Input device information.
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    pub index: usize,
    pub name: String,
    pub channels: u16,
    pub sample_rate: u32,
}

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` due to platform internals. The handle is only
/// touched through `&mut CpalCapture`, which the tracking thread owns, and is
/// dropped with it.
struct StreamHandle(cpal::Stream);

// SAFETY: the stream is never accessed concurrently; it is owned by a single
// `CpalCapture` and only played, paused and dropped through `&mut self`.
unsafe impl Send for StreamHandle {}

/// Records the default (or a selected) input device into a rolling buffer.
///
/// The callback downmixes to mono, applies the input gain and tracks the peak
/// level; it never allocates or blocks.
pub struct CpalCapture {
    device_index: Option<usize>,
    sample_rate: u32,
    channels: u16,
    buffer: Arc<RollingBuffer>,
    input_gain: Arc<InputGain>,
    peak_level: Arc<PeakMeter>,
    guard: Arc<CallbackGuard>,
    stream: Option<StreamHandle>,
}

impl CpalCapture {
    /// Open an input device with a ring of `ring_seconds` of audio.
    ///
    /// The device's native sample rate wins over any configured rate.
    pub fn new(device_index: Option<usize>, ring_seconds: f32) -> Result<Self> {
        let device = Self::get_device(device_index)?;
        let config = device.default_input_config()?;
        let sample_rate = config.sample_rate().0;
        let len = (sample_rate as f32 * ring_seconds.max(0.1)).ceil() as usize;

        tracing::info!(
            "Input device '{}': {} Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            config.channels()
        );

        Ok(Self {
            device_index,
            sample_rate,
            channels: config.channels(),
            buffer: Arc::new(RollingBuffer::new(len)),
            input_gain: Arc::new(InputGain::new(1.0)),
            peak_level: Arc::new(PeakMeter::default()),
            guard: Arc::new(CallbackGuard::default()),
            stream: None,
        })
    }

    pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>> {
        let host = cpal::default_host();
        let mut devices = Vec::new();

        for (index, device) in host.input_devices()?.enumerate() {
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
            let Ok(config) = device.default_input_config() else {
                continue;
            };
            devices.push(InputDeviceInfo {
                index,
                name,
                channels: config.channels(),
                sample_rate: config.sample_rate().0,
            });
        }

        Ok(devices)
    }

    pub fn device_name(&self) -> Result<String> {
        let device = Self::get_device(self.device_index)?;
        Ok(device.name()?)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Range: 0.0 to 2.0.
    pub fn set_gain(&self, gain: f32) {
        self.input_gain.set(gain);
    }

    pub fn gain(&self) -> f32 {
        self.input_gain.get()
    }

    /// Peak absolute level since the last call; resets to zero.
    pub fn take_peak_level(&self) -> f32 {
        self.peak_level.take()
    }

    /// Input callbacks that panicked; their samples were dropped.
    pub fn callback_panics(&self) -> u64 {
        self.guard.panics()
    }

    /// Shared view of the rolling buffer.
    pub fn buffer(&self) -> Arc<RollingBuffer> {
        Arc::clone(&self.buffer)
    }

    fn get_device(index: Option<usize>) -> Result<cpal::Device> {
        let host = cpal::default_host();

        if let Some(idx) = index {
            let devices: Vec<_> = host.input_devices()?.collect();

            let device_count = devices.len();
            devices.into_iter().nth(idx).ok_or_else(|| {
                Error::InvalidDevice(format!(
                    "Input device index {} out of range (available: {})",
                    idx, device_count
                ))
            })
        } else {
            host.default_input_device()
                .ok_or_else(|| Error::InvalidDevice("No input device available".to_string()))
        }
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<cpal::Stream>
    where
        T: cpal::SizedSample,
        f32: cpal::FromSample<T>,
    {
        let channels = (config.channels as usize).max(1);
        let scale = 1.0 / channels as f32;
        let buffer = Arc::clone(&self.buffer);
        let gain = Arc::clone(&self.input_gain);
        let peak = Arc::clone(&self.peak_level);
        let guard = Arc::clone(&self.guard);

        let stream = device.build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                guard.run(|| {
                    let gain = gain.get() * scale;
                    let mut frame_peak = 0.0f32;

                    buffer.push_iter(data.chunks_exact(channels).map(|frame| {
                        let sum: f32 = frame.iter().map(|&s| s.to_sample::<f32>()).sum();
                        let mono = sum * gain;
                        frame_peak = frame_peak.max(mono.abs());
                        mono
                    }));

                    peak.record(frame_peak);
                });
            },
            |err| {
                tracing::error!("Input stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }
}

impl CaptureDevice for CpalCapture {
    fn start(&mut self) -> Result<()> {
        if self.buffer.is_capturing() {
            return Ok(());
        }

        if self.stream.is_none() {
            let device = Self::get_device(self.device_index)?;
            let config = device.default_input_config()?;

            let stream = match config.sample_format() {
                cpal::SampleFormat::F32 => self.build_stream::<f32>(&device, &config.into())?,
                cpal::SampleFormat::I16 => self.build_stream::<i16>(&device, &config.into())?,
                cpal::SampleFormat::U16 => self.build_stream::<u16>(&device, &config.into())?,
                format => {
                    return Err(Error::InvalidConfig(format!(
                        "Unsupported sample format: {:?}",
                        format
                    )));
                }
            };
            self.stream = Some(StreamHandle(stream));
        }

        if let Some(StreamHandle(stream)) = &self.stream {
            stream.play()?;
        }
        self.buffer.set_capturing(true);
        Ok(())
    }

    fn stop(&mut self) {
        self.buffer.set_capturing(false);
        if let Some(StreamHandle(stream)) = &self.stream {
            if let Err(e) = stream.pause() {
                tracing::warn!("Failed to pause input stream: {}", e);
            }
        }
    }

    fn is_capturing(&self) -> bool {
        self.buffer.is_capturing()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    fn write_position(&self) -> Option<u64> {
        self.buffer
            .is_capturing()
            .then(|| self.buffer.written())
    }

    fn read(&self, offset: usize, dest: &mut [f32]) -> usize {
        self.buffer.read_into(offset, dest)
    }
}
