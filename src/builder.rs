//! Builder for configuring and constructing a [`Coordinator`].

use crate::coordinator::Coordinator;
use crate::exporter::FileExporter;
use crate::renderer::InProcessRenderer;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{AudioFormat, PlayingConfig};
use tessera_player::Player;
use tracing::info;

/// Every collaborator of a built coordinator.
///
/// The renderer is what an audio callback drives; the player and exporter
/// are exposed for inspection and manual worker stepping.
pub struct Tessera {
    pub coordinator: Coordinator,
    pub renderer: Arc<InProcessRenderer>,
    pub player: Arc<Player>,
    pub exporter: Arc<FileExporter>,
}

/// The renderer's output format normally comes from the audio device. When
/// no renderer is supplied, one is created from [`output_format`](Self::output_format).
///
/// # Example
///
/// ```ignore
/// use tessera::prelude::*;
///
/// let renderer = Arc::new(InProcessRenderer::new(Some(AudioFormat::new(
///     48000,
///     PcmFormat::Float32,
///     2,
/// ))));
///
/// let coordinator = TesseraBuilder::new("/tmp/tessera")
///     .renderer(renderer.clone())
///     .build()?;
///
/// coordinator.set_timeline(timeline, "song");
/// coordinator.set_playing(true);
/// // the audio callback calls renderer.render(&mut buffer)
/// ```
#[derive(Default)]
pub struct TesseraBuilder {
    config: PlayingConfig,
    renderer: Option<Arc<InProcessRenderer>>,
    output_format: Option<AudioFormat>,
    manual_worker: bool,
}

impl TesseraBuilder {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self::from_config(PlayingConfig::with_root(root_path))
    }

    pub fn from_config(config: PlayingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn root_path(mut self, root_path: impl Into<PathBuf>) -> Self {
        self.config.root_path = root_path.into();
        self
    }

    /// Default: 3
    pub fn element_count(mut self, count: usize) -> Self {
        self.config.element_count = count;
        self
    }

    /// Default: 1ms
    pub fn worker_idle_sleep(mut self, sleep: Duration) -> Self {
        self.config.worker_idle_sleep = sleep;
        self
    }

    /// Default: true
    pub fn worker_priority(mut self, raise: bool) -> Self {
        self.config.worker_priority = raise;
        self
    }

    /// Only takes effect with the `parallel-io` feature.
    pub fn parallel_io(mut self, enabled: bool) -> Self {
        self.config.parallel_io = enabled;
        self
    }

    /// Default: 64
    pub fn export_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.export_queue_capacity = capacity;
        self
    }

    pub fn renderer(mut self, renderer: Arc<InProcessRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Ignored when a renderer is supplied.
    pub fn output_format(mut self, format: AudioFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Leaves the player worker stopped; drive it with `Player::run_worker_once`.
    pub fn manual_worker(mut self) -> Self {
        self.manual_worker = true;
        self
    }

    pub fn config(&self) -> &PlayingConfig {
        &self.config
    }

    pub fn build(self) -> Result<Coordinator> {
        Ok(self.build_parts()?.coordinator)
    }

    pub fn build_parts(self) -> Result<Tessera> {
        self.config.validate()?;

        let renderer = self
            .renderer
            .unwrap_or_else(|| Arc::new(InProcessRenderer::new(self.output_format)));

        let exporter = Arc::new(FileExporter::new(
            &self.config.root_path,
            self.config.export_queue_capacity,
        )?);
        let player = Arc::new(Player::with_config(&self.config, renderer.clone())?);

        if !self.manual_worker {
            player.start()?;
        }

        let coordinator = Coordinator::new(renderer.clone(), player.clone(), exporter.clone());

        info!(
            root = %self.config.root_path.display(),
            element_count = self.config.element_count,
            "tessera coordinator built"
        );

        Ok(Tessera {
            coordinator,
            renderer,
            player,
            exporter,
        })
    }
}
