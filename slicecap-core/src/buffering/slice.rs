//! Fixed-capacity stereo sample container.

use serde::{Deserialize, Serialize};

/// Number of interleaved channels delivered by the capture stream.
pub const CHANNELS: usize = 2;

/// Selects one side of a stereo slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Left,
    Right,
}

/// One slice worth of stereo `i32` samples plus a fill cursor.
///
/// Both channel arrays are allocated (zero-filled) once in [`SliceBuffer::new`]
/// and overwritten in place afterwards. Samples in `[0, len())` are valid;
/// anything past the cursor is left over from an earlier slice.
#[derive(Debug, Clone)]
pub struct SliceBuffer {
    left: Vec<i32>,
    right: Vec<i32>,
    fill_cursor: usize,
}

impl SliceBuffer {
    /// Allocate a zeroed buffer holding `capacity_frames` stereo frames.
    pub fn new(capacity_frames: usize) -> Self {
        assert!(capacity_frames > 0, "slice capacity must be positive");
        Self {
            left: vec![0; capacity_frames],
            right: vec![0; capacity_frames],
            fill_cursor: 0,
        }
    }

    /// Rewind the cursor. Stale samples are not cleared.
    pub fn reset(&mut self) {
        self.fill_cursor = 0;
    }

    /// Write `count` frames taken from the fronts of `left` and `right`.
    ///
    /// The caller guarantees `count <= remaining_capacity()` and that both
    /// inputs hold at least `count` samples.
    pub fn append(&mut self, left: &[i32], right: &[i32], count: usize) -> usize {
        debug_assert!(count <= self.remaining_capacity());
        let end = self.fill_cursor + count;
        self.left[self.fill_cursor..end].copy_from_slice(&left[..count]);
        self.right[self.fill_cursor..end].copy_from_slice(&right[..count]);
        self.fill_cursor = end;
        count
    }

    /// Write frames from a flat `L, R, L, R, ...` slice, widening each sample
    /// to `i32`. A trailing half frame is ignored.
    ///
    /// Used from the audio callback: no allocation, no bounds recovery. The
    /// caller guarantees the frames fit.
    pub fn append_interleaved<S>(&mut self, interleaved: &[S]) -> usize
    where
        S: Copy + Into<i32>,
    {
        let frames = interleaved.len() / CHANNELS;
        debug_assert!(frames <= self.remaining_capacity());
        let start = self.fill_cursor;
        let left = &mut self.left[start..start + frames];
        let right = &mut self.right[start..start + frames];
        for ((frame, l), r) in interleaved
            .chunks_exact(CHANNELS)
            .zip(left.iter_mut())
            .zip(right.iter_mut())
        {
            *l = frame[0].into();
            *r = frame[1].into();
        }
        self.fill_cursor += frames;
        frames
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity() - self.fill_cursor
    }

    pub fn capacity(&self) -> usize {
        self.left.len()
    }

    /// Number of valid frames.
    pub fn len(&self) -> usize {
        self.fill_cursor
    }

    pub fn is_empty(&self) -> bool {
        self.fill_cursor == 0
    }

    pub fn is_full(&self) -> bool {
        self.fill_cursor == self.capacity()
    }

    /// Valid left-channel samples.
    pub fn left(&self) -> &[i32] {
        &self.left[..self.fill_cursor]
    }

    /// Valid right-channel samples.
    pub fn right(&self) -> &[i32] {
        &self.right[..self.fill_cursor]
    }

    pub fn channel(&self, channel: Channel) -> &[i32] {
        match channel {
            Channel::Left => self.left(),
            Channel::Right => self.right(),
        }
    }

    /// Iterate valid frames as `(left, right)` pairs.
    pub fn frames(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.left().iter().copied().zip(self.right().iter().copied())
    }
}
