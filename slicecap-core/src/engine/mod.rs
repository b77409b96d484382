//! `CaptureEngine`: top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! CaptureEngine::new()          status = Idle
//!     └─► start(sink)           device open, drain loop spawned, status = Capturing
//!         └─► stop()            running=false, stream dropped, status = Stopped
//! ```
//!
//! A stream failure or fatal sink error moves the status to `Error` and
//! resolves the join handle returned by `start` with the error.
//!
//! ## Threading
//!
//! `cpal::Stream` is `!Send` on Windows/macOS (COM / CoreAudio thread affinity).
//! `AudioCapture` is therefore created *inside* the `spawn_blocking` closure so
//! it never crosses a thread boundary. A sync oneshot channel propagates any
//! open-device errors back to the `start()` caller.

pub mod pipeline;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{error, info};

use crate::{
    audio::AudioCapture,
    buffering::{create_slice_buffers, CaptureDiagnostics, DiagnosticsSnapshot},
    codec::OutputChannel,
    error::{Result, SlicecapError},
    events::{EngineStatus, EngineStatusEvent},
    sink::SliceSink,
};

pub use pipeline::{DrainSummary, StopReason};

/// Broadcast channel capacity for status events.
const BROADCAST_CAP: usize = 64;

/// What happens once the drain loop notices an overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Report it, keep capturing, accept the dropped frames.
    #[default]
    Continue,
    /// Report it and end the run with `SlicecapError::Overflow`.
    Stop,
}

impl OverflowPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "continue" | "drop" => Some(OverflowPolicy::Continue),
            "stop" | "abort" => Some(OverflowPolicy::Stop),
            _ => None,
        }
    }
}

/// Configuration for `CaptureEngine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct CaptureConfig {
    /// Stream sample rate (Hz). Default: 192000.
    pub sample_rate: u32,
    /// Frames per audio callback. Default: 2048.
    pub period_frames: u32,
    /// Slices per second of audio; slice length is
    /// `sample_rate / slices_per_second` frames. Default: 10.
    pub slices_per_second: u32,
    /// Channel(s) written to the line output. Default: right.
    pub output_channel: OutputChannel,
    /// Default: continue.
    pub overflow_policy: OverflowPolicy,
    /// Drain loop sleep when no slice is ready. Default: 1 ms.
    pub poll_interval_ms: u64,
    /// Input device name; `None` uses the host default.
    pub preferred_input_device: Option<String>,
    /// Stop cleanly after this many slices. `None` runs until stopped.
    pub max_slices: Option<usize>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 192_000,
            period_frames: 2_048,
            slices_per_second: 10,
            output_channel: OutputChannel::Right,
            overflow_policy: OverflowPolicy::Continue,
            poll_interval_ms: 1,
            preferred_input_device: None,
            max_slices: None,
        }
    }
}

impl CaptureConfig {
    /// Frames per slice.
    pub fn slice_frames(&self) -> usize {
        if self.slices_per_second == 0 {
            return 0;
        }
        (self.sample_rate / self.slices_per_second) as usize
    }

    /// Reject configurations the double buffer cannot honour. A slice must
    /// hold at least one full period: one callback may complete at most one
    /// slice.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(SlicecapError::InvalidConfig("sample rate must be positive".into()));
        }
        if self.period_frames == 0 {
            return Err(SlicecapError::InvalidConfig("period frames must be positive".into()));
        }
        if self.slices_per_second == 0 {
            return Err(SlicecapError::InvalidConfig(
                "slices per second must be positive".into(),
            ));
        }
        let slice_frames = self.slice_frames();
        if slice_frames < self.period_frames as usize {
            return Err(SlicecapError::InvalidConfig(format!(
                "slice of {slice_frames} frames is shorter than one {}-frame period",
                self.period_frames
            )));
        }
        if self.max_slices == Some(0) {
            return Err(SlicecapError::InvalidConfig("slice limit must be positive".into()));
        }
        Ok(())
    }
}

/// The top-level engine handle.
///
/// `CaptureEngine` is `Send + Sync`; the CLI shares it between the main task
/// and its Ctrl-C handler.
pub struct CaptureEngine {
    config: CaptureConfig,
    /// `true` while capture + drain loop are active.
    running: Arc<AtomicBool>,
    status: Arc<Mutex<EngineStatus>>,
    status_tx: broadcast::Sender<EngineStatusEvent>,
    diagnostics: Arc<CaptureDiagnostics>,
}

impl CaptureEngine {
    /// Create a new engine. Does not open the device; call `start()`.
    pub fn new(config: CaptureConfig) -> Self {
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(EngineStatus::Idle)),
            status_tx,
            diagnostics: Arc::new(CaptureDiagnostics::default()),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Open the input device and start draining slices into `sink`.
    ///
    /// Must be called from within a Tokio runtime. Blocks until the audio
    /// device is confirmed open (or fails); the returned handle resolves when
    /// the drain loop ends.
    ///
    /// # Errors
    /// - `SlicecapError::AlreadyRunning` if already started.
    /// - `SlicecapError::InvalidConfig` for an unusable configuration.
    /// - Device and stream errors from opening the input.
    pub fn start(&self, sink: Box<dyn SliceSink>) -> Result<JoinHandle<Result<DrainSummary>>> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SlicecapError::AlreadyRunning);
        }
        self.config.validate()?;

        self.diagnostics.reset();
        self.running.store(true, Ordering::SeqCst);

        let (producer, consumer) =
            create_slice_buffers(self.config.slice_frames(), Arc::clone(&self.diagnostics));

        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let status = Arc::clone(&self.status);
        let status_tx = self.status_tx.clone();
        let stream_failed = Arc::new(AtomicBool::new(false));

        // Sync oneshot: drain thread signals open success/failure to start().
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<u32>>();

        let handle = tokio::task::spawn_blocking(move || {
            // Open the device on THIS thread: cpal::Stream is !Send.
            let capture = match AudioCapture::open(
                producer,
                &config,
                Arc::clone(&running),
                Arc::clone(&stream_failed),
            ) {
                Ok(c) => {
                    let _ = open_tx.send(Ok(c.sample_rate));
                    c
                }
                Err(e) => {
                    running.store(false, Ordering::SeqCst);
                    let detail = e.to_string();
                    let _ = open_tx.send(Err(e));
                    return Err(SlicecapError::AudioStream(detail));
                }
            };

            let result = pipeline::run(pipeline::DrainContext {
                config,
                consumer,
                sink,
                running: Arc::clone(&running),
                stream_failed,
            });

            running.store(false, Ordering::SeqCst);
            // Stream drops here, releasing the audio device on this thread.
            drop(capture);

            let (new_status, detail) = match &result {
                Ok(_) => (EngineStatus::Stopped, None),
                Err(e) => {
                    error!("capture ended with error: {e}");
                    (EngineStatus::Error, Some(e.to_string()))
                }
            };
            *status.lock() = new_status;
            let _ = status_tx.send(EngineStatusEvent {
                status: new_status,
                detail,
            });
            result
        });

        // Block start() until device open is confirmed.
        match open_rx.recv() {
            Ok(Ok(rate)) => {
                self.set_status(EngineStatus::Capturing, None);
                info!(
                    sample_rate = rate,
                    slice_frames = self.config.slice_frames(),
                    "=== now recording ==="
                );
                Ok(handle)
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                self.set_status(EngineStatus::Error, Some(e.to_string()));
                Err(e)
            }
            Err(_) => {
                // Channel closed before a message was sent: the blocking task panicked.
                self.running.store(false, Ordering::SeqCst);
                self.set_status(EngineStatus::Error, Some("capture failed to start".into()));
                Err(SlicecapError::Other(anyhow::anyhow!(
                    "capture task died unexpectedly"
                )))
            }
        }
    }

    /// Ask the drain loop to stop; the stream is released when it exits.
    ///
    /// # Errors
    /// - `SlicecapError::NotRunning` if not currently running.
    pub fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(SlicecapError::NotRunning);
        }
        self.running.store(false, Ordering::SeqCst);
        info!("engine stop requested");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current engine status (snapshot).
    pub fn status(&self) -> EngineStatus {
        *self.status.lock()
    }

    /// Subscribe to status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<EngineStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Snapshot of the capture counters for observability.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    fn set_status(&self, new_status: EngineStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(EngineStatusEvent {
            status: new_status,
            detail,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CaptureConfig::default();
        config.validate().unwrap();
        assert_eq!(config.slice_frames(), 19_200);
    }

    #[test]
    fn rejects_slice_shorter_than_period() {
        let config = CaptureConfig {
            sample_rate: 8_000,
            period_frames: 1_024,
            slices_per_second: 10,
            ..CaptureConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SlicecapError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_fields() {
        for config in [
            CaptureConfig {
                sample_rate: 0,
                ..CaptureConfig::default()
            },
            CaptureConfig {
                period_frames: 0,
                ..CaptureConfig::default()
            },
            CaptureConfig {
                slices_per_second: 0,
                ..CaptureConfig::default()
            },
            CaptureConfig {
                max_slices: Some(0),
                ..CaptureConfig::default()
            },
        ] {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn config_json_uses_camel_case_and_defaults() {
        let config: CaptureConfig =
            serde_json::from_str(r#"{"sampleRate":48000,"outputChannel":"both"}"#).unwrap();
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.output_channel, OutputChannel::Both);
        assert_eq!(config.period_frames, 2_048);
        assert_eq!(config.overflow_policy, OverflowPolicy::Continue);
    }

    #[test]
    fn overflow_policy_parsing() {
        assert_eq!(OverflowPolicy::parse("STOP"), Some(OverflowPolicy::Stop));
        assert_eq!(OverflowPolicy::parse("drop"), Some(OverflowPolicy::Continue));
        assert_eq!(OverflowPolicy::parse("retry"), None);
    }

    #[test]
    fn stop_before_start_is_an_error() {
        let engine = CaptureEngine::new(CaptureConfig::default());
        assert!(matches!(engine.stop(), Err(SlicecapError::NotRunning)));
        assert_eq!(engine.status(), EngineStatus::Idle);
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn invalid_config_fails_before_opening_device() {
        let engine = CaptureEngine::new(CaptureConfig {
            period_frames: 0,
            ..CaptureConfig::default()
        });
        let sink = Box::new(crate::sink::LineSink::new(
            Vec::new(),
            1,
            OutputChannel::Right,
        ));
        assert!(matches!(
            engine.start(sink),
            Err(SlicecapError::InvalidConfig(_))
        ));
        assert!(!engine.is_running());
    }
}
