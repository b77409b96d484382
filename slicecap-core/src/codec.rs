//! Text codec for drained slices.
//!
//! One channel of one slice becomes one line: decimal integers separated by
//! `,` and terminated by `\n`. There is no header or length prefix, readers
//! split on newlines.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::{
    buffering::{Channel, SliceBuffer},
    error::{Result, SlicecapError},
};

/// Widest rendering of one sample plus its separator (`-2147483648,`).
pub const MAX_SAMPLE_TEXT: usize = 12;

/// Which channel(s) of a slice are written to the output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputChannel {
    Left,
    #[default]
    Right,
    /// Left line first, then right line.
    Both,
}

impl OutputChannel {
    pub fn channels(self) -> &'static [Channel] {
        match self {
            OutputChannel::Left => &[Channel::Left],
            OutputChannel::Right => &[Channel::Right],
            OutputChannel::Both => &[Channel::Left, Channel::Right],
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Some(OutputChannel::Left),
            "r" | "right" => Some(OutputChannel::Right),
            "both" | "stereo" | "lr" => Some(OutputChannel::Both),
            _ => None,
        }
    }
}

/// Append `samples` as one comma-separated line to `out`.
///
/// An empty input still produces a bare `\n`.
pub fn format_line(samples: &[i32], out: &mut Vec<u8>) {
    for (idx, sample) in samples.iter().enumerate() {
        if idx > 0 {
            out.push(b',');
        }
        // Writing into a Vec<u8> cannot fail.
        let _ = write!(out, "{sample}");
    }
    out.push(b'\n');
}

/// Parse one line produced by [`format_line`]. A trailing `\n` or `\r\n` is
/// accepted; blank lines parse to an empty vector.
pub fn parse_line(line: &str) -> Result<Vec<i32>> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut column = 0;
    let mut samples = Vec::with_capacity(line.len() / 2 + 1);
    for field in line.split(',') {
        let value = field
            .trim()
            .parse::<i32>()
            .map_err(|e| SlicecapError::MalformedLine {
                column,
                reason: format!("{field:?}: {e}"),
            })?;
        samples.push(value);
        column += field.len() + 1;
    }
    Ok(samples)
}

/// Consumer-owned formatter that renders slices into a scratch buffer sized
/// once for the largest slice and reuses it for every drain.
#[derive(Debug)]
pub struct SliceWriter {
    channels: OutputChannel,
    scratch: Vec<u8>,
}

impl SliceWriter {
    pub fn new(capacity_frames: usize, channels: OutputChannel) -> Self {
        let lines = channels.channels().len();
        Self {
            channels,
            scratch: Vec::with_capacity(capacity_frames * MAX_SAMPLE_TEXT * lines + lines),
        }
    }

    /// Render the configured channel(s) of `slice`; the returned bytes stay
    /// valid until the next call.
    pub fn render(&mut self, slice: &SliceBuffer) -> &[u8] {
        self.scratch.clear();
        for &channel in self.channels.channels() {
            format_line(slice.channel(channel), &mut self.scratch);
        }
        &self.scratch
    }

    /// Render and write `slice` to `out` in one call.
    pub fn write_to<W: Write>(&mut self, slice: &SliceBuffer, out: &mut W) -> std::io::Result<()> {
        let bytes = self.render(slice);
        out.write_all(bytes)
    }

    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice_of(frames: &[(i32, i32)]) -> SliceBuffer {
        let mut buf = SliceBuffer::new(frames.len());
        let left: Vec<i32> = frames.iter().map(|f| f.0).collect();
        let right: Vec<i32> = frames.iter().map(|f| f.1).collect();
        buf.append(&left, &right, frames.len());
        buf
    }

    #[test]
    fn formats_comma_separated_line() {
        let mut out = Vec::new();
        format_line(&[1, 3, 5, 7], &mut out);
        assert_eq!(out, b"1,3,5,7\n");
    }

    #[test]
    fn formats_extremes() {
        let mut out = Vec::new();
        format_line(&[i32::MIN, 0, i32::MAX], &mut out);
        assert_eq!(out, b"-2147483648,0,2147483647\n");
    }

    #[test]
    fn empty_line_is_newline() {
        let mut out = Vec::new();
        format_line(&[], &mut out);
        assert_eq!(out, b"\n");
        assert!(parse_line("\n").unwrap().is_empty());
    }

    #[test]
    fn format_then_parse_round_trips() {
        let samples = vec![0, -1, 42, i32::MIN, i32::MAX, -65_536, 1 << 20];
        let mut out = Vec::new();
        format_line(&samples, &mut out);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(parse_line(&text).unwrap(), samples);
    }

    #[test]
    fn parse_accepts_crlf_and_spaces() {
        assert_eq!(parse_line(" 1, 2 ,3\r\n").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn parse_reports_column_of_bad_field() {
        match parse_line("1,22,x3") {
            Err(SlicecapError::MalformedLine { column, .. }) => assert_eq!(column, 5),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn writer_renders_selected_channel() {
        let slice = slice_of(&[(1, 2), (3, 4), (5, 6), (7, 8)]);

        let mut left = SliceWriter::new(4, OutputChannel::Left);
        assert_eq!(left.render(&slice), b"1,3,5,7\n");

        let mut right = SliceWriter::new(4, OutputChannel::Right);
        assert_eq!(right.render(&slice), b"2,4,6,8\n");

        let mut both = SliceWriter::new(4, OutputChannel::Both);
        assert_eq!(both.render(&slice), b"1,3,5,7\n2,4,6,8\n");
    }

    #[test]
    fn writer_scratch_is_not_regrown() {
        let mut writer = SliceWriter::new(3, OutputChannel::Both);
        let before = writer.scratch_capacity();
        let slice = slice_of(&[(i32::MIN, i32::MIN); 3]);
        writer.render(&slice);
        writer.render(&slice);
        assert_eq!(writer.scratch_capacity(), before);
    }

    #[test]
    fn output_channel_parsing() {
        assert_eq!(OutputChannel::parse("Left"), Some(OutputChannel::Left));
        assert_eq!(OutputChannel::parse(" r "), Some(OutputChannel::Right));
        assert_eq!(OutputChannel::parse("both"), Some(OutputChannel::Both));
        assert_eq!(OutputChannel::parse("center"), None);
    }
}
