//! Frame and fragment arithmetic for the render loop.

use tessera_core::math::{floor_int, mod_int};
use tessera_core::{FragmentIndex, FrameIndex};

/// Fragment containing `frame`, or `None` for a zero fragment length.
pub fn top_fragment_index(fragment_length: u32, frame: FrameIndex) -> Option<FragmentIndex> {
    if fragment_length == 0 {
        return None;
    }
    let length = fragment_length as u64;
    Some(floor_int(frame, length) / length as i64)
}

/// Frames to process from `frame` without crossing a fragment boundary or `next_frame`.
pub fn process_length(frame: FrameIndex, next_frame: FrameIndex, fragment_length: u32) -> u32 {
    let to_next = (next_frame - frame) as u32;
    let to_boundary = (fragment_length as i64 - mod_int(frame, fragment_length as u64)) as u32;
    to_next.min(to_boundary)
}

/// Fragment that finishes when `length` frames from `frame` are processed, if any.
pub fn advancing_fragment_index(
    frame: FrameIndex,
    length: u32,
    fragment_length: u32,
) -> Option<FragmentIndex> {
    let interval = fragment_length as u64;
    if mod_int(frame + length as i64, interval) == 0 {
        Some(floor_int(frame, interval) / fragment_length.max(1) as i64)
    } else {
        None
    }
}
