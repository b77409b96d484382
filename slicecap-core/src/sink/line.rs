//! Comma-separated text sink.

use std::io::{ErrorKind, Write};

use crate::{
    buffering::SliceBuffer,
    codec::{OutputChannel, SliceWriter},
    error::Result,
};

use super::SliceSink;

/// Writes the configured channel(s) of each slice as text lines to `W`,
/// flushing after every slice so downstream readers see whole lines promptly.
pub struct LineSink<W> {
    name: String,
    formatter: SliceWriter,
    out: W,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W, capacity_frames: usize, channels: OutputChannel) -> Self {
        Self {
            name: format!("lines:{channels:?}").to_ascii_lowercase(),
            formatter: SliceWriter::new(capacity_frames, channels),
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl LineSink<std::io::Stdout> {
    /// Line sink on the process's standard output.
    pub fn stdout(capacity_frames: usize, channels: OutputChannel) -> Self {
        Self::new(std::io::stdout(), capacity_frames, channels)
    }
}

impl<W: Write + Send> SliceSink for LineSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_slice(&mut self, slice: &SliceBuffer) -> Result<()> {
        self.formatter.write_to(slice, &mut self.out)?;
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match self.out.flush() {
            // Reader already went away; nothing left to deliver.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            Err(e) => Err(e.into()),
            Ok(()) => Ok(()),
        }
    }
}
