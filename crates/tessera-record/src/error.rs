//! Error types for record file I/O

use std::io;
use tessera_core::SampleType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalWriteError {
    #[error("failed to open signal file: {0}")]
    Open(#[source] io::Error),
    #[error("failed to write signal file: {0}")]
    Write(#[source] io::Error),
    #[error("failed to close signal file: {0}")]
    Close(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum SignalReadError {
    #[error("signal sample type {actual:?} does not match buffer type {expected:?}")]
    InvalidSampleType {
        expected: SampleType,
        actual: SampleType,
    },
    #[error("signal frames [{frame}, {next_frame}) outside buffer [{buffer_frame}, {buffer_next_frame})")]
    OutOfRange {
        frame: i64,
        next_frame: i64,
        buffer_frame: i64,
        buffer_next_frame: i64,
    },
    #[error("failed to open signal file: {0}")]
    Open(#[source] io::Error),
    #[error("failed to read signal file: {0}")]
    Read(#[source] io::Error),
    #[error("signal file holds {actual} bytes, expected {expected}")]
    ReadCountNotMatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum NumbersWriteError {
    #[error("failed to open numbers file: {0}")]
    Open(#[source] io::Error),
    #[error("failed to write numbers file: {0}")]
    Write(#[source] io::Error),
    #[error("failed to close numbers file: {0}")]
    Close(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum NumbersReadError {
    #[error("failed to open numbers file: {0}")]
    Open(#[source] io::Error),
    #[error("failed to read frame: {0}")]
    ReadFrame(#[source] io::Error),
    #[error("failed to read sample store type: {0}")]
    ReadSampleStoreType(#[source] io::Error),
    #[error("failed to read value: {0}")]
    ReadValue(#[source] io::Error),
    #[error("unknown sample store type tag {0}")]
    SampleStoreTypeNotFound(u8),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to remove fragment: {0}")]
    RemoveFragment(#[source] io::Error),
    #[error("failed to create fragment directory: {0}")]
    CreateDirectory(#[source] io::Error),
    #[error("failed to write signal: {0}")]
    WriteSignal(#[from] SignalWriteError),
    #[error("failed to write numbers: {0}")]
    WriteNumbers(#[from] NumbersWriteError),
    #[error("failed to list content paths: {0}")]
    ContentPaths(#[source] io::Error),
}

/// Record crate error type
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    SignalWrite(#[from] SignalWriteError),
    #[error(transparent)]
    SignalRead(#[from] SignalReadError),
    #[error(transparent)]
    NumbersWrite(#[from] NumbersWriteError),
    #[error(transparent)]
    NumbersRead(#[from] NumbersReadError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Result type alias for record operations
pub type Result<T> = std::result::Result<T, Error>;
