use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Error};
use slicecap_core::{
    events::EngineStatus, CaptureConfig, CaptureEngine, LineSink, SliceSink, TeeSink, WavSink,
};
use tracing::{debug, info, warn};

use crate::settings::AppSettings;

/// Records from the input device and writes one line per slice to stdout
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CaptureArgs {
    /// Input device name (exact match); host default otherwise
    #[arg(long)]
    pub device: Option<String>,

    /// Sample rate in Hz
    #[arg(long = "sample-rate")]
    pub rate: Option<u32>,

    /// Frames per audio callback
    #[arg(long = "period-frames")]
    pub period: Option<u32>,

    /// Slices per second of audio
    #[arg(long)]
    pub slices_per_second: Option<u32>,

    /// Channel written to stdout: left, right or both
    #[arg(long)]
    pub channel: Option<String>,

    /// Overflow handling: continue or stop
    #[arg(long)]
    pub on_overflow: Option<String>,

    /// Drain loop poll interval in milliseconds
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Exit after writing this many slices
    #[arg(long)]
    pub slices: Option<usize>,

    /// Also record both channels to a 32-bit WAV file
    #[arg(long)]
    pub wav: Option<PathBuf>,
}

pub async fn main(args: CaptureArgs, mut settings: AppSettings) -> Result<(), Error> {
    settings.apply_args(&args);
    let config = settings.capture_config(args.slices);
    config.validate()?;

    let sink = build_sink(&config, settings.wav_path.as_deref())?;
    let engine = Arc::new(CaptureEngine::new(config));

    let mut status_rx = engine.subscribe_status();
    tokio::spawn(async move {
        while let Ok(event) = status_rx.recv().await {
            debug!(status = ?event.status, detail = ?event.detail, "engine status");
            if event.status.is_terminal() {
                break;
            }
        }
    });

    // start() blocks until the device has opened.
    let mut handle = {
        let engine = Arc::clone(&engine);
        tokio::task::block_in_place(move || engine.start(sink))?
    };

    let joined = tokio::select! {
        joined = &mut handle => joined,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("interrupt received, stopping capture");
            if let Err(e) = engine.stop() {
                warn!("stop after interrupt: {e}");
            }
            handle.await
        }
    };
    let summary = joined.context("capture task panicked")??;

    info!(
        reason = ?summary.reason,
        slices_written = summary.slices_written,
        frames_captured = summary.diagnostics.frames_captured,
        slices_drained = summary.diagnostics.slices_drained,
        overflow_events = summary.diagnostics.overflow_events,
        frames_dropped = summary.diagnostics.frames_dropped,
        "capture finished"
    );
    if engine.status() != EngineStatus::Stopped {
        warn!(status = ?engine.status(), "engine did not reach stopped state");
    }
    Ok(())
}

fn build_sink(
    config: &CaptureConfig,
    wav_path: Option<&std::path::Path>,
) -> Result<Box<dyn SliceSink>, Error> {
    let lines = LineSink::stdout(config.slice_frames(), config.output_channel);
    match wav_path {
        Some(path) => {
            let wav = WavSink::create(path, config.sample_rate)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(TeeSink::new(lines, wav)))
        }
        None => Ok(Box::new(lines)),
    }
}
