//! Double-buffered stereo slices.
//!
//! [`SliceBuffer`] is the fixed-capacity container; [`create_slice_buffers`]
//! allocates the active/standby pair and splits it into the
//! [`SliceProducer`] (audio callback) and [`SliceConsumer`] (drain loop).

pub mod coordinator;
pub mod slice;

pub use coordinator::{
    create_slice_buffers, CaptureDiagnostics, CaptureOutcome, CoordinatorState,
    DiagnosticsSnapshot, SliceConsumer, SliceProducer,
};
pub use slice::{Channel, SliceBuffer, CHANNELS};
