//! Destinations for drained slices.
//!
//! A [`SliceSink`] receives each completed slice exactly once, on the drain
//! loop's thread. Built-in sinks:
//!
//! - [`LineSink`]: comma-separated text lines (stdout in the CLI)
//! - [`WavSink`]: stereo 32-bit PCM WAV file
//! - [`TeeSink`]: forwards every slice to two sinks in order

mod line;
mod wav;

pub use line::LineSink;
pub use wav::WavSink;

use crate::{buffering::SliceBuffer, error::Result};

/// A destination for completed slices.
///
/// Implementations run on the drain loop's thread, not the audio callback,
/// so they may block and perform I/O.
pub trait SliceSink: Send {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Consume one completed slice. An error ends the capture run.
    fn write_slice(&mut self, slice: &SliceBuffer) -> Result<()>;

    /// Called once when the drain loop ends, including after errors.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: SliceSink + ?Sized> SliceSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_slice(&mut self, slice: &SliceBuffer) -> Result<()> {
        (**self).write_slice(slice)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Writes every slice to `first`, then to `second`.
pub struct TeeSink<A, B> {
    name: String,
    first: A,
    second: B,
}

impl<A: SliceSink, B: SliceSink> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            name: format!("{}+{}", first.name(), second.name()),
            first,
            second,
        }
    }
}

impl<A: SliceSink, B: SliceSink> SliceSink for TeeSink<A, B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_slice(&mut self, slice: &SliceBuffer) -> Result<()> {
        self.first.write_slice(slice)?;
        self.second.write_slice(slice)
    }

    fn finish(&mut self) -> Result<()> {
        let first = self.first.finish();
        let second = self.second.finish();
        first.and(second)
    }
}
