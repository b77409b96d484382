//! Stereo WAV file sink.

use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::{
    buffering::{SliceBuffer, CHANNELS},
    error::Result,
};

use super::SliceSink;

/// Appends both channels of every slice to a 32-bit integer PCM WAV file.
///
/// The header is finalized in [`SliceSink::finish`]; a file from a run that
/// was killed before then has a stale length field.
pub struct WavSink {
    name: String,
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    frames_written: u64,
}

impl WavSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let spec = WavSpec {
            channels: CHANNELS as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(&path, spec)?;
        Ok(Self {
            name: format!("wav:{}", path.display()),
            path,
            writer: Some(writer),
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl SliceSink for WavSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_slice(&mut self, slice: &SliceBuffer) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        for (left, right) in slice.frames() {
            writer.write_sample(left)?;
            writer.write_sample(right)?;
        }
        self.frames_written += slice.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            info!(
                path = %self.path.display(),
                frames = self.frames_written,
                "WAV file finalized"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slices.wav");

        let mut sink = WavSink::create(&path, 48_000).unwrap();
        let mut slice = SliceBuffer::new(3);
        slice.append_interleaved(&[1i32, -1, i32::MAX, i32::MIN, 0, 7]);
        sink.write_slice(&slice).unwrap();
        sink.write_slice(&slice).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.frames_written(), 6);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48_000);
        assert_eq!(spec.bits_per_sample, 32);
        let samples: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        assert_eq!(
            samples,
            vec![1, -1, i32::MAX, i32::MIN, 0, 7, 1, -1, i32::MAX, i32::MIN, 0, 7]
        );
    }

    #[test]
    fn finish_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = WavSink::create(dir.path().join("empty.wav"), 8_000).unwrap();
        sink.finish().unwrap();
        sink.finish().unwrap();
    }
}
