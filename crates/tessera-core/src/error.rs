//! Error types for tessera-core

use crate::sample::SampleType;
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("Sample type mismatch: expected {expected:?}, got {actual:?}")]
    SampleTypeMismatch {
        expected: SampleType,
        actual: SampleType,
    },

    #[error("Frame range out of bounds: offset {offset} + length {length} exceeds {capacity}")]
    OutOfRange {
        offset: usize,
        length: usize,
        capacity: usize,
    },

    #[error("Channel {index} out of bounds (count {count})")]
    ChannelOutOfRange { index: usize, count: usize },

    #[error("Byte count {bytes} is not a multiple of sample size {sample_size}")]
    UnalignedBytes { bytes: usize, sample_size: usize },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for tessera-core operations
pub type Result<T> = std::result::Result<T, Error>;
