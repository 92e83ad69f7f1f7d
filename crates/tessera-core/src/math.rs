//! Integer helpers that round toward negative infinity.
//!
//! `%` and `/` truncate toward zero, which is wrong for frames before the
//! timeline origin. These always snap to the interval grid below (or above).

use crate::types::{FrameIndex, TimeRange};

/// Non-negative remainder of `value` on an `interval` grid. Zero interval yields 0.
pub fn mod_int(value: i64, interval: u64) -> i64 {
    if interval == 0 || value == 0 {
        return 0;
    }
    let mod_ = value % interval as i64;
    if mod_ == 0 {
        0
    } else if value > 0 {
        mod_
    } else {
        interval as i64 + mod_
    }
}

/// Largest multiple of `interval` not greater than `value`.
pub fn floor_int(value: i64, interval: u64) -> i64 {
    if interval == 0 || value == 0 {
        return if interval == 0 { value } else { 0 };
    }
    let mod_ = value % interval as i64;
    if mod_ == 0 {
        value
    } else if value > 0 {
        value - mod_
    } else {
        value - mod_ - interval as i64
    }
}

/// Smallest multiple of `interval` not less than `value`.
pub fn ceil_int(value: i64, interval: u64) -> i64 {
    if interval == 0 || value == 0 {
        return if interval == 0 { value } else { 0 };
    }
    let mod_ = value % interval as i64;
    if mod_ == 0 {
        value
    } else if value > 0 {
        value - mod_ + interval as i64
    } else {
        value - mod_
    }
}

/// Expands a frame range outward to whole fragments of `fragment_length` frames.
pub fn fragments_range(range: TimeRange, fragment_length: u32) -> TimeRange {
    let interval = fragment_length as u64;
    let frame: FrameIndex = floor_int(range.frame, interval);
    let next_frame = ceil_int(range.next_frame(), interval);
    TimeRange::new(frame, (next_frame - frame) as u64)
}
