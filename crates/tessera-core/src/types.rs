//! Index and range value types shared across the engine.

use serde::{Deserialize, Serialize};

/// Absolute frame position on a timeline. May be negative.
pub type FrameIndex = i64;
/// Fragment position; fragment `i` covers frames `[i * len, (i + 1) * len)`.
pub type FragmentIndex = i64;
/// Channel index as stored on disk (the "file" channel).
pub type ChannelIndex = i64;
pub type SampleRate = u32;
pub type Length = u64;

/// A half-open run of fragments `[index, index + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentRange {
    pub index: FragmentIndex,
    pub length: Length,
}

impl FragmentRange {
    pub fn new(index: FragmentIndex, length: Length) -> Self {
        Self { index, length }
    }

    #[inline]
    pub fn next_index(&self) -> FragmentIndex {
        self.index + self.length as FragmentIndex
    }

    #[inline]
    pub fn contains(&self, index: FragmentIndex) -> bool {
        self.index <= index && index < self.next_index()
    }
}

/// A region of the cache to refresh.
///
/// `file_channel_index == None` addresses every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementAddress {
    pub file_channel_index: Option<ChannelIndex>,
    pub fragment_range: FragmentRange,
}

/// A half-open frame range `[frame, frame + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub frame: FrameIndex,
    pub length: Length,
}

impl TimeRange {
    pub fn new(frame: FrameIndex, length: Length) -> Self {
        Self { frame, length }
    }

    #[inline]
    pub fn next_frame(&self) -> FrameIndex {
        self.frame + self.length as FrameIndex
    }

    /// True when `other` lies entirely within this range.
    pub fn is_contain(&self, other: &TimeRange) -> bool {
        self.frame <= other.frame && other.next_frame() <= self.next_frame()
    }

    /// Whole fragments covering this range, given a fragment length in frames.
    pub fn fragments(&self, fragment_length: u32) -> FragmentRange {
        let frames = crate::math::fragments_range(*self, fragment_length);
        if fragment_length == 0 {
            return FragmentRange::new(0, 0);
        }
        let len = fragment_length as i64;
        FragmentRange::new(frames.frame / len, frames.length / fragment_length as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_range_contains_is_half_open() {
        let range = FragmentRange::new(2, 3);
        assert!(!range.contains(1));
        assert!(range.contains(2));
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }

    #[test]
    fn test_empty_fragment_range_contains_nothing() {
        let range = FragmentRange::new(0, 0);
        assert!(!range.contains(0));
    }

    #[test]
    fn test_time_range_fragments_rounds_outward() {
        let range = TimeRange::new(1000, 500);
        assert_eq!(range.fragments(512), FragmentRange::new(1, 2));
    }

    #[test]
    fn test_time_range_fragments_negative() {
        let range = TimeRange::new(-10, 20);
        assert_eq!(range.fragments(512), FragmentRange::new(-1, 2));
    }

    #[test]
    fn test_time_range_is_contain() {
        let outer = TimeRange::new(0, 100);
        assert!(outer.is_contain(&TimeRange::new(10, 90)));
        assert!(!outer.is_contain(&TimeRange::new(10, 91)));
    }
}
