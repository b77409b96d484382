//! # slicecap-core
//!
//! Real-time stereo capture in fixed-size slices.
//!
//! ## Architecture
//!
//! ```text
//! Input device → AudioCapture callback → SliceProducer::capture
//!                                              │ (active full → swap)
//!                                        ready slot
//!                                              │
//!                         drain loop (spawn_blocking) → SliceSink
//!                                                         ├─ LineSink  → stdout
//!                                                         └─ WavSink   → file
//! ```
//!
//! The audio callback is zero-alloc and lock-free. All formatting and I/O
//! happens on the drain loop's thread.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod analysis;
pub mod audio;
pub mod buffering;
pub mod codec;
pub mod engine;
pub mod error;
pub mod events;
pub mod sink;

// Convenience re-exports for downstream crates
pub use buffering::{create_slice_buffers, SliceBuffer, SliceConsumer, SliceProducer};
pub use codec::OutputChannel;
pub use engine::{CaptureConfig, CaptureEngine, DrainSummary, OverflowPolicy, StopReason};
pub use error::SlicecapError;
pub use events::{EngineStatus, EngineStatusEvent};
pub use sink::{LineSink, SliceSink, TeeSink, WavSink};
