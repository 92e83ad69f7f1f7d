//! Playback engine configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the player, worker and exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayingConfig {
    /// Root directory of the fragment cache.
    pub root_path: PathBuf,
    /// Fragments held per channel; also the distance a window advances.
    pub element_count: usize,
    /// Worker sleep when a cycle processed nothing.
    pub worker_idle_sleep: Duration,
    /// Request maximum OS priority for the worker thread.
    pub worker_priority: bool,
    /// Refill channels in parallel during all-writing.
    pub parallel_io: bool,
    /// Pending export requests before `export` starts dropping them.
    pub export_queue_capacity: usize,
}

impl Default for PlayingConfig {
    fn default() -> Self {
        Self {
            root_path: std::env::temp_dir().join("tessera"),
            element_count: 3,
            worker_idle_sleep: Duration::from_millis(1),
            worker_priority: true,
            parallel_io: false,
            export_queue_capacity: 64,
        }
    }
}

impl PlayingConfig {
    pub fn with_root(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.root_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("root_path is empty".into()));
        }
        if self.element_count < 2 {
            return Err(Error::InvalidConfig(format!(
                "element_count {} must be at least 2",
                self.element_count
            )));
        }
        if self.export_queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "export_queue_capacity must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
