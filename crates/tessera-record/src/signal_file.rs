//! Signal records: raw sample runs for a contiguous frame range.

use crate::error::{SignalReadError, SignalWriteError};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tessera_core::path::SIGNAL_FILE_PREFIX;
use tessera_core::{FrameIndex, PcmBuffer, SampleData, SampleType, TimeRange};

/// A signal record located on disk, decoded from its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalFileInfo {
    pub path: PathBuf,
    pub range: TimeRange,
    pub sample_type: SampleType,
}

impl SignalFileInfo {
    /// Parses `signal_<frame>_<length>_<code>`. Malformed names yield `None`.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?;
        let (range, sample_type) = parse_name(name)?;
        Some(Self {
            path: path.to_path_buf(),
            range,
            sample_type,
        })
    }
}

/// Shorthand for [`SignalFileInfo::from_path`].
pub fn to_signal_file_info(path: impl AsRef<Path>) -> Option<SignalFileInfo> {
    SignalFileInfo::from_path(path)
}

fn parse_name(name: &str) -> Option<(TimeRange, SampleType)> {
    let parts: Vec<&str> = name.split('_').collect();
    let [prefix, frame, length, code] = parts.as_slice() else {
        return None;
    };
    if *prefix != SIGNAL_FILE_PREFIX {
        return None;
    }
    let sample_type = SampleType::from_code(code)?;
    let frame: FrameIndex = frame.parse().ok()?;
    let length: u64 = length.parse().ok()?;
    // The range must be representable on the frame axis.
    frame.checked_add(FrameIndex::try_from(length).ok()?)?;
    Some((TimeRange::new(frame, length), sample_type))
}

/// End frame of the record, or `None` when it does not fit in a frame index.
fn record_next_frame(range: TimeRange) -> Option<FrameIndex> {
    range.frame.checked_add(FrameIndex::try_from(range.length).ok()?)
}

fn record_byte_length(info: &SignalFileInfo) -> Option<usize> {
    usize::try_from(info.range.length)
        .ok()?
        .checked_mul(info.sample_type.byte_size())
}

/// Writes every sample of `data` as native-endian bytes.
pub fn write(path: impl AsRef<Path>, data: &SampleData) -> Result<(), SignalWriteError> {
    let file = File::create(path).map_err(SignalWriteError::Open)?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&data.to_ne_bytes())
        .map_err(SignalWriteError::Write)?;
    let file = writer
        .into_inner()
        .map_err(|e| SignalWriteError::Close(e.into_error()))?;
    file.sync_all().map_err(SignalWriteError::Close)
}

/// Reads the whole record described by `info` as raw bytes.
pub fn read_bytes(info: &SignalFileInfo) -> Result<Vec<u8>, SignalReadError> {
    let expected = record_byte_length(info).ok_or(SignalReadError::OutOfRange {
        frame: info.range.frame,
        next_frame: record_next_frame(info.range).unwrap_or(FrameIndex::MAX),
        buffer_frame: 0,
        buffer_next_frame: 0,
    })?;
    let file = File::open(&info.path).map_err(SignalReadError::Open)?;
    let mut bytes = Vec::with_capacity(expected);
    file.take(expected as u64)
        .read_to_end(&mut bytes)
        .map_err(SignalReadError::Read)?;
    if bytes.len() != expected {
        return Err(SignalReadError::ReadCountNotMatch {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Reads a record into channel 0 of `buffer`, whose first frame sits at
/// `buffer_top_frame` on the timeline.
///
/// Returns the number of bytes read.
pub fn read(
    info: &SignalFileInfo,
    buffer: &mut PcmBuffer,
    buffer_top_frame: FrameIndex,
) -> Result<usize, SignalReadError> {
    let expected = buffer.format().sample_type();
    if info.sample_type != expected {
        return Err(SignalReadError::InvalidSampleType {
            expected,
            actual: info.sample_type,
        });
    }

    let buffer_next_frame = FrameIndex::try_from(buffer.frame_length())
        .ok()
        .and_then(|length| buffer_top_frame.checked_add(length))
        .unwrap_or(FrameIndex::MAX);
    let record_next = record_next_frame(info.range);
    let out_of_range = || SignalReadError::OutOfRange {
        frame: info.range.frame,
        next_frame: record_next.unwrap_or(FrameIndex::MAX),
        buffer_frame: buffer_top_frame,
        buffer_next_frame,
    };
    let Some(record_next) = record_next else {
        return Err(out_of_range());
    };
    if info.range.frame < buffer_top_frame || buffer_next_frame < record_next {
        return Err(out_of_range());
    }

    let bytes = read_bytes(info)?;
    let offset = (info.range.frame - buffer_top_frame) as usize;
    buffer
        .write_ne_bytes(0, offset, &bytes)
        .map_err(|_| out_of_range())?;
    Ok(bytes.len())
}
