//! Centralized error type for the tessera umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tessera_core::Error),

    #[error("Record: {0}")]
    Record(#[from] tessera_record::Error),

    #[error("Player: {0}")]
    Player(#[from] tessera_player::Error),

    #[error("Failed to spawn exporter thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
