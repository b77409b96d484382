//! Audio capture via cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It **must not**:
//! - Allocate heap memory
//! - Block on a mutex or condvar
//! - Perform I/O
//!
//! This module satisfies that contract by handing each period straight to
//! [`SliceProducer::capture`], which only copies samples and moves buffers
//! between pre-allocated single-slot queues. The callback never stops the
//! stream itself; stream errors are flagged for the drain loop.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on macOS).
//! `AudioCapture` therefore must be created and dropped on the same thread.
//! The engine accomplishes this by calling `open` inside `spawn_blocking`.

pub mod device;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, SampleFormat, SampleRate, Stream, StreamConfig,
};

#[cfg(feature = "audio-cpal")]
use crate::buffering::CHANNELS;
use crate::{
    buffering::SliceProducer,
    engine::CaptureConfig,
    error::{Result, SlicecapError},
};
#[cfg(feature = "audio-cpal")]
use std::sync::atomic::Ordering;
use std::sync::{atomic::AtomicBool, Arc};
#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

/// Handle to an active audio capture stream.
///
/// **Not `Send`**: `cpal::Stream` is bound to its creation thread on Windows/macOS.
/// Create and drop this type on the same OS thread.
pub struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Sample rate the stream was opened with (Hz).
    pub sample_rate: u32,
}

impl AudioCapture {
    /// Open the preferred (or default) input device as a two-channel integer
    /// stream with a fixed period and feed every period into `producer`.
    ///
    /// # Errors
    /// - `SlicecapError::NoDefaultInputDevice` when no input is available.
    /// - `SlicecapError::UnsupportedSampleFormat` when the device offers no
    ///   stereo `i32`/`i16` configuration at the requested rate.
    /// - `SlicecapError::AudioStream` if cpal fails to build or start the stream.
    #[cfg(feature = "audio-cpal")]
    pub fn open(
        mut producer: SliceProducer,
        config: &CaptureConfig,
        running: Arc<AtomicBool>,
        stream_failed: Arc<AtomicBool>,
    ) -> Result<Self> {
        let device = select_input_device(config.preferred_input_device.as_deref())?;

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let sample_format = pick_sample_format(&device, config.sample_rate)?;
        let stream_config = StreamConfig {
            channels: CHANNELS as u16,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: BufferSize::Fixed(config.period_frames),
        };

        info!(
            sample_rate = config.sample_rate,
            period_frames = config.period_frames,
            format = ?sample_format,
            "audio config selected"
        );

        let on_error = move |err: cpal::StreamError| {
            error!("audio stream error: {err}");
            stream_failed.store(true, Ordering::Release);
        };

        let running_cb = running;
        let stream = match sample_format {
            SampleFormat::I32 => device.build_input_stream(
                &stream_config,
                move |data: &[i32], _info| {
                    if !running_cb.load(Ordering::Relaxed) {
                        return;
                    }
                    producer.capture(data);
                },
                on_error,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _info| {
                    if !running_cb.load(Ordering::Relaxed) {
                        return;
                    }
                    producer.capture(data);
                },
                on_error,
                None,
            ),
            fmt => {
                return Err(SlicecapError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| SlicecapError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| SlicecapError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            sample_rate: config.sample_rate,
        })
    }
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl AudioCapture {
    pub fn open(
        _producer: SliceProducer,
        _config: &CaptureConfig,
        _running: Arc<AtomicBool>,
        _stream_failed: Arc<AtomicBool>,
    ) -> Result<Self> {
        Err(SlicecapError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }
}

/// Preferred device by exact name, else the host default input.
#[cfg(feature = "audio-cpal")]
fn select_input_device(preferred_name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    if let Some(preferred_name) = preferred_name {
        match host.input_devices() {
            Ok(mut devices) => {
                if let Some(device) = devices.find(|device| {
                    device
                        .name()
                        .map(|name| name == preferred_name)
                        .unwrap_or(false)
                }) {
                    return Ok(device);
                }
                warn!(
                    "preferred input device '{}' not found, falling back to default",
                    preferred_name
                );
            }
            Err(e) => {
                warn!("failed to list input devices while resolving preference: {e}");
            }
        }
    }

    host.default_input_device()
        .ok_or(SlicecapError::NoDefaultInputDevice)
}

/// Integer formats the capture path accepts, best first.
#[cfg(feature = "audio-cpal")]
const INTEGER_FORMATS: [SampleFormat; 2] = [SampleFormat::I32, SampleFormat::I16];

#[cfg(feature = "audio-cpal")]
fn pick_sample_format(device: &cpal::Device, sample_rate: u32) -> Result<SampleFormat> {
    let ranges = device
        .supported_input_configs()
        .map_err(|e| SlicecapError::AudioDevice(e.to_string()))?
        .filter(|range| {
            range.channels() as usize == CHANNELS
                && range.min_sample_rate().0 <= sample_rate
                && sample_rate <= range.max_sample_rate().0
        })
        .map(|range| range.sample_format())
        .collect::<Vec<_>>();

    INTEGER_FORMATS
        .into_iter()
        .find(|fmt| ranges.contains(fmt))
        .ok_or(SlicecapError::UnsupportedSampleFormat { sample_rate })
}

#[cfg(all(test, not(feature = "audio-cpal")))]
mod tests {
    use super::*;
    use crate::buffering::{create_slice_buffers, CaptureDiagnostics};

    #[test]
    fn open_without_backend_reports_stream_error() {
        let (producer, _consumer) = create_slice_buffers(4, Arc::new(CaptureDiagnostics::default()));
        let result = AudioCapture::open(
            producer,
            &CaptureConfig::default(),
            Arc::new(AtomicBool::new(true)),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(matches!(result, Err(SlicecapError::AudioStream(_))));
    }
}
