//! Fragment-cached playback.
//!
//! A [`Player`] streams previously exported fragments from disk into a host's
//! render callback without touching the file system on the render thread.
//!
//! - **Render context**: the host callback; only flips states, try-locks and copies
//! - **Task context**: a [`Worker`] thread that allocates buffers and reads fragments
//!
//! Each output channel keeps a rolling window of `element_count` fragments
//! ([`BufferingChannel`]). Crossing a fragment boundary on render hands the
//! finished element back to the worker, which refills it with the fragment
//! `element_count` ahead.
//!
//! # Example
//!
//! ```ignore
//! use tessera_player::{Player, PlayingConfig};
//!
//! let player = Player::with_config(&PlayingConfig::with_root("/cache"), host)?;
//! player.set_identifier("song");
//! player.start()?;
//! player.set_playing(true);
//! ```

// Error types
pub mod error;
pub use error::{Error, Result};

// Buffering cache
pub mod buffering;
pub mod channel;
pub mod element;
pub mod metrics;

pub use buffering::{Buffering, BufferingResource, RenderingState, SetupState};
pub use channel::{BufferingChannel, FragmentChannel, MakeChannel};
pub use element::{BufferingElement, ElementState, FragmentElement};
pub use metrics::{BufferingMetrics, MetricsSnapshot};

// Render/task coordination
pub mod player;
pub mod reading;
pub mod resource;
pub mod utils;
pub mod worker;

pub use player::{Player, RenderHost, RenderingHandler, TaskPriority};
pub use reading::{Reading, ReadingResource, ReadingState};
pub use resource::{PlayerResource, SeekState};
pub use worker::{TaskResult, Worker, WorkerState, WorkerTask};

pub use tessera_core::PlayingConfig;
