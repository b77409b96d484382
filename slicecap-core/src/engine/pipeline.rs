//! Blocking drain loop.
//!
//! ## Per iteration
//!
//! ```text
//! 1. Stop if the running flag is down or the slice limit was reached
//! 2. Fail if the stream error callback has fired
//! 3. Report overflow events recorded by the callback since last iteration
//! 4. Drain the ready slice into the sink, or sleep one poll interval
//! ```
//!
//! This loop runs in `spawn_blocking` next to the `!Send` cpal stream; it is
//! the consumer side of the double buffer and has no real-time constraint.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    buffering::{DiagnosticsSnapshot, SliceConsumer},
    engine::{CaptureConfig, OverflowPolicy},
    error::{Result, SlicecapError},
    sink::SliceSink,
};

/// All context the drain loop needs, passed as one struct so the closure stays tidy.
pub struct DrainContext {
    pub config: CaptureConfig,
    pub consumer: SliceConsumer,
    pub sink: Box<dyn SliceSink>,
    pub running: Arc<AtomicBool>,
    /// Raised by the stream error callback.
    pub stream_failed: Arc<AtomicBool>,
}

/// Why the drain loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// `running` was lowered (Ctrl-C, `CaptureEngine::stop`).
    Stopped,
    /// `max_slices` slices were written.
    SliceLimit,
    /// The output reader went away (broken pipe).
    OutputClosed,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainSummary {
    pub reason: StopReason,
    pub slices_written: usize,
    pub diagnostics: DiagnosticsSnapshot,
}

/// Run the drain loop until stopped, the slice limit is hit, or a fatal
/// error occurs. The sink is finished on every exit path.
pub fn run(mut ctx: DrainContext) -> Result<DrainSummary> {
    info!(sink = ctx.sink.name(), "drain loop started");
    let outcome = drain_until_done(&mut ctx);
    let finished = ctx.sink.finish();

    let diagnostics = ctx.consumer.diagnostics().snapshot();
    match outcome {
        Ok((reason, slices_written)) => {
            finished?;
            info!(
                ?reason,
                slices_written,
                frames_captured = diagnostics.frames_captured,
                overflow_events = diagnostics.overflow_events,
                frames_dropped = diagnostics.frames_dropped,
                "drain loop finished"
            );
            Ok(DrainSummary {
                reason,
                slices_written,
                diagnostics,
            })
        }
        Err(e) => {
            if let Err(finish_err) = finished {
                warn!("sink finish failed after error: {finish_err}");
            }
            Err(e)
        }
    }
}

fn drain_until_done(ctx: &mut DrainContext) -> Result<(StopReason, usize)> {
    let poll = Duration::from_millis(ctx.config.poll_interval_ms.max(1));
    let diagnostics = Arc::clone(ctx.consumer.diagnostics());
    let mut reported_overflows = 0usize;
    let mut slices_written = 0usize;

    loop {
        if !ctx.running.load(Ordering::Relaxed) {
            return Ok((StopReason::Stopped, slices_written));
        }
        if ctx
            .config
            .max_slices
            .is_some_and(|limit| slices_written >= limit)
        {
            return Ok((StopReason::SliceLimit, slices_written));
        }
        if ctx.stream_failed.load(Ordering::Acquire) {
            return Err(SlicecapError::StreamInactive);
        }

        let overflow_events = diagnostics.overflow_events.load(Ordering::Relaxed);
        if overflow_events > reported_overflows {
            let dropped_frames = diagnostics.frames_dropped.load(Ordering::Relaxed);
            warn!(
                new_events = overflow_events - reported_overflows,
                total_events = overflow_events,
                dropped_frames,
                "buffer overflow: slice not drained before the next one completed"
            );
            reported_overflows = overflow_events;
            if ctx.config.overflow_policy == OverflowPolicy::Stop {
                return Err(SlicecapError::Overflow { dropped_frames });
            }
        }

        let sink = &mut ctx.sink;
        match ctx.consumer.drain(|slice| sink.write_slice(slice)) {
            Some(Ok(())) => {
                slices_written += 1;
                debug!(slices_written, "slice written");
            }
            Some(Err(SlicecapError::Io(e))) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                info!("output closed by reader");
                return Ok((StopReason::OutputClosed, slices_written));
            }
            Some(Err(e)) => return Err(e),
            None => std::thread::sleep(poll),
        }
    }
}
