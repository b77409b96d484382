//! Active/standby double buffer shared by the audio callback and the drain loop.
//!
//! ## Hand-off
//!
//! ```text
//!            capture()                          drain()
//! callback ─────────► active ──(full)──► ready slot ─────► SliceConsumer
//!                        ▲                                     │
//!                        └──────────── free slot ◄─────────────┘
//! ```
//!
//! Exactly two [`SliceBuffer`]s exist. The producer always owns the active
//! one; the other sits in the `free` slot (standby, idle), in the `ready` slot
//! (a completed slice waiting to be drained), or in the consumer's hands while
//! it is being drained. Both slots are single-element `ringbuf` queues, so a
//! swap is two wait-free moves of the buffer's vector headers. The push on one
//! side and the pop on the other give the release/acquire pairing that makes
//! the full slice visible to the consumer once it pops it.
//!
//! The `slice_ready` flag is raised by the producer after the hand-off and
//! lowered by the consumer once the buffer is back in the free slot. Overflow
//! is decided by the free slot alone: if the standby buffer has not come back,
//! a second completed slice has nowhere to go.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};
use serde::Serialize;

use super::slice::{SliceBuffer, CHANNELS};

/// Coordinator state as seen by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorState {
    /// Active buffer accepting samples, no slice pending.
    Filling,
    /// A completed slice is staged (or being drained) in standby.
    Drainable,
}

/// Result of a single [`SliceProducer::capture`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// All frames went into the active buffer; it is not full yet.
    Filling,
    /// The active buffer completed a slice and roles were swapped.
    Swapped,
    /// The active buffer is full but the previous slice is still undrained.
    Overflow { dropped_frames: usize },
}

/// Counters shared by both halves. Relaxed atomics only, safe to touch from
/// the audio callback.
#[derive(Default)]
pub struct CaptureDiagnostics {
    pub frames_captured: AtomicUsize,
    pub slices_completed: AtomicUsize,
    pub slices_drained: AtomicUsize,
    pub overflow_events: AtomicUsize,
    pub frames_dropped: AtomicUsize,
    overflowed: AtomicBool,
}

impl CaptureDiagnostics {
    pub fn reset(&self) {
        self.frames_captured.store(0, Ordering::Relaxed);
        self.slices_completed.store(0, Ordering::Relaxed);
        self.slices_drained.store(0, Ordering::Relaxed);
        self.overflow_events.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
        self.overflowed.store(false, Ordering::Relaxed);
    }

    /// Sticky: once set it stays set until [`CaptureDiagnostics::reset`].
    pub fn overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            slices_completed: self.slices_completed.load(Ordering::Relaxed),
            slices_drained: self.slices_drained.load(Ordering::Relaxed),
            overflow_events: self.overflow_events.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            overflowed: self.overflowed(),
        }
    }

    fn record_overflow(&self, dropped_frames: usize) {
        self.overflowed.store(true, Ordering::Relaxed);
        self.overflow_events.fetch_add(1, Ordering::Relaxed);
        self.frames_dropped
            .fetch_add(dropped_frames, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub frames_captured: usize,
    pub slices_completed: usize,
    pub slices_drained: usize,
    pub overflow_events: usize,
    pub frames_dropped: usize,
    pub overflowed: bool,
}

/// Producer half, owned by the audio callback.
pub struct SliceProducer {
    active: SliceBuffer,
    ready: HeapProd<SliceBuffer>,
    free: HeapCons<SliceBuffer>,
    slice_ready: Arc<AtomicBool>,
    diagnostics: Arc<CaptureDiagnostics>,
}

/// Consumer half, owned by the drain loop.
pub struct SliceConsumer {
    ready: HeapCons<SliceBuffer>,
    free: HeapProd<SliceBuffer>,
    slice_ready: Arc<AtomicBool>,
    diagnostics: Arc<CaptureDiagnostics>,
}

/// Allocate both slice buffers and split them into producer/consumer halves.
///
/// This is the only allocation the hand-off ever performs.
pub fn create_slice_buffers(
    capacity_frames: usize,
    diagnostics: Arc<CaptureDiagnostics>,
) -> (SliceProducer, SliceConsumer) {
    let (ready_tx, ready_rx) = HeapRb::<SliceBuffer>::new(1).split();
    let (mut free_tx, free_rx) = HeapRb::<SliceBuffer>::new(1).split();

    let seeded = free_tx.try_push(SliceBuffer::new(capacity_frames));
    debug_assert!(seeded.is_ok(), "fresh free slot occupied");
    let slice_ready = Arc::new(AtomicBool::new(false));

    let producer = SliceProducer {
        active: SliceBuffer::new(capacity_frames),
        ready: ready_tx,
        free: free_rx,
        slice_ready: Arc::clone(&slice_ready),
        diagnostics: Arc::clone(&diagnostics),
    };
    let consumer = SliceConsumer {
        ready: ready_rx,
        free: free_tx,
        slice_ready,
        diagnostics,
    };
    (producer, consumer)
}

impl SliceProducer {
    /// Append one period of interleaved stereo frames.
    ///
    /// Real-time safe: no allocation, no locking, bounded work. When the
    /// active buffer fills, the completed slice is handed to the consumer and
    /// the leftover frames spill into the recycled standby buffer. If the
    /// previous slice has not been drained yet, the leftover frames are
    /// dropped and the overflow is recorded; the full active buffer is handed
    /// over on the first call after the consumer catches up.
    ///
    /// A single call can complete at most one slice; frames beyond one spill
    /// are dropped and counted.
    pub fn capture<S>(&mut self, interleaved: &[S]) -> CaptureOutcome
    where
        S: Copy + Into<i32>,
    {
        let frames_available = interleaved.len() / CHANNELS;
        let take = self.active.remaining_capacity().min(frames_available);
        self.active
            .append_interleaved(&interleaved[..take * CHANNELS]);
        self.diagnostics
            .frames_captured
            .fetch_add(take, Ordering::Relaxed);

        if !self.active.is_full() {
            return CaptureOutcome::Filling;
        }

        let leftover = &interleaved[take * CHANNELS..frames_available * CHANNELS];
        let leftover_frames = frames_available - take;

        let Some(mut standby) = self.free.try_pop() else {
            self.diagnostics.record_overflow(leftover_frames);
            return CaptureOutcome::Overflow {
                dropped_frames: leftover_frames,
            };
        };

        standby.reset();
        let completed = std::mem::replace(&mut self.active, standby);
        // Raised before the push so the consumer never pops an unflagged slice.
        self.slice_ready.store(true, Ordering::Release);
        // Two buffers, one slot: the ready slot is empty whenever the free
        // slot was occupied.
        let handed_off = self.ready.try_push(completed);
        debug_assert!(handed_off.is_ok(), "ready slot occupied during swap");
        self.diagnostics
            .slices_completed
            .fetch_add(1, Ordering::Relaxed);

        let spill = self.active.remaining_capacity().min(leftover_frames);
        self.active
            .append_interleaved(&leftover[..spill * CHANNELS]);
        self.diagnostics
            .frames_captured
            .fetch_add(spill, Ordering::Relaxed);
        if spill < leftover_frames {
            self.diagnostics
                .frames_dropped
                .fetch_add(leftover_frames - spill, Ordering::Relaxed);
        }

        CaptureOutcome::Swapped
    }

    /// `true` while a completed slice is waiting for, or undergoing, a drain.
    pub fn is_slice_ready(&self) -> bool {
        self.slice_ready.load(Ordering::Acquire)
    }

    pub fn state(&self) -> CoordinatorState {
        if self.is_slice_ready() {
            CoordinatorState::Drainable
        } else {
            CoordinatorState::Filling
        }
    }

    pub fn overflowed(&self) -> bool {
        self.diagnostics.overflowed()
    }

    /// Frames already written to the active buffer.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }
}

impl SliceConsumer {
    /// Hand the completed slice to `read`, then give the buffer back to the
    /// producer. Returns `None` without touching any buffer when no slice is
    /// ready.
    pub fn drain<R>(&mut self, read: impl FnOnce(&SliceBuffer) -> R) -> Option<R> {
        let slice = self.ready.try_pop()?;
        let out = read(&slice);
        self.diagnostics
            .slices_drained
            .fetch_add(1, Ordering::Relaxed);
        // Lowered before the buffer goes back, so the producer's next swap
        // cannot be masked by a late clear.
        self.slice_ready.store(false, Ordering::Release);
        // The producer holds the only other buffer, so the free slot is empty.
        let returned = self.free.try_push(slice);
        debug_assert!(returned.is_ok(), "free slot occupied after drain");
        Some(out)
    }

    /// `true` when a completed slice is waiting in the ready slot.
    pub fn is_slice_ready(&self) -> bool {
        self.slice_ready.load(Ordering::Acquire)
    }

    pub fn overflowed(&self) -> bool {
        self.diagnostics.overflowed()
    }

    pub fn diagnostics(&self) -> &Arc<CaptureDiagnostics> {
        &self.diagnostics
    }
}
