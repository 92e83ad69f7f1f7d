//! Numbers records: sparse typed values keyed by frame.
//!
//! Each entry is `[frame: i64][tag: u8][payload]`, native-endian, with the
//! payload size given by the tag's sample type. Several entries may share a
//! frame; order on disk is preserved on read.

use crate::error::{NumbersReadError, NumbersWriteError};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tessera_core::{FrameIndex, NumberValue, SampleType};

/// Frame-ordered multimap of number values.
pub type NumberEvents = Vec<(FrameIndex, NumberValue)>;

pub fn write(path: impl AsRef<Path>, events: &[(FrameIndex, NumberValue)]) -> Result<(), NumbersWriteError> {
    let file = File::create(path).map_err(NumbersWriteError::Open)?;
    let mut writer = BufWriter::new(file);

    for (frame, value) in events {
        write_entry(&mut writer, *frame, value).map_err(NumbersWriteError::Write)?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| NumbersWriteError::Close(e.into_error()))?;
    file.sync_all().map_err(NumbersWriteError::Close)
}

pub fn read(path: impl AsRef<Path>) -> Result<NumberEvents, NumbersReadError> {
    let file = File::open(path).map_err(NumbersReadError::Open)?;
    let mut reader = BufReader::new(file);
    let mut events = NumberEvents::new();

    loop {
        let mut frame = [0u8; 8];
        match read_full(&mut reader, &mut frame).map_err(NumbersReadError::ReadFrame)? {
            0 => break,
            8 => {}
            _ => return Err(NumbersReadError::ReadFrame(truncated())),
        }

        let mut tag = [0u8; 1];
        if read_full(&mut reader, &mut tag).map_err(NumbersReadError::ReadSampleStoreType)? != 1 {
            return Err(NumbersReadError::ReadSampleStoreType(truncated()));
        }
        let sample_type =
            SampleType::from_tag(tag[0]).ok_or(NumbersReadError::SampleStoreTypeNotFound(tag[0]))?;

        let mut payload = [0u8; 8];
        let payload = &mut payload[..sample_type.byte_size()];
        if read_full(&mut reader, payload).map_err(NumbersReadError::ReadValue)? != payload.len() {
            return Err(NumbersReadError::ReadValue(truncated()));
        }
        let value = NumberValue::from_ne_bytes(sample_type, payload)
            .map_err(|e| NumbersReadError::ReadValue(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        events.push((FrameIndex::from_ne_bytes(frame), value));
    }

    Ok(events)
}

fn write_entry(writer: &mut impl Write, frame: FrameIndex, value: &NumberValue) -> io::Result<()> {
    writer.write_all(&frame.to_ne_bytes())?;
    writer.write_all(&[value.sample_type().tag()])?;
    writer.write_all(&value.to_ne_bytes())
}

/// Reads until `buf` is full or EOF, returning the byte count.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn truncated() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "record truncated")
}
