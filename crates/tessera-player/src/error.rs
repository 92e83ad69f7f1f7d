//! Error types for tessera-player

use std::io;
use tessera_record::SignalReadError;
use thiserror::Error;

/// Player error type
#[derive(Debug, Error)]
pub enum Error {
    /// An operation was called in a state that does not allow it.
    #[error("{operation} called in state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Invalid format: {0}")]
    InvalidFormat(&'static str),

    #[error("Invalid task priority: rendering ({rendering}) must come after setup ({setup})")]
    InvalidPriority { setup: u32, rendering: u32 },

    #[error("Failed to list fragment directory: {0}")]
    ContentPaths(#[source] io::Error),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error(transparent)]
    SignalRead(#[from] SignalReadError),

    #[error(transparent)]
    Core(#[from] tessera_core::Error),
}

impl Error {
    pub(crate) fn invalid_state(operation: &'static str, state: &'static str) -> Self {
        Error::InvalidState { operation, state }
    }
}

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;
