//! # Tessera - Fragment-Cached Streaming Playback
//!
//! Plays timelines that an exporter renders into one-second fragment files,
//! keeping a small window of fragments per channel in memory.
//!
//! ## Architecture
//!
//! Tessera is an umbrella crate that coordinates:
//! - **tessera-core** - Shared types (ranges, path model, samples, PCM buffers, lock-free cells)
//! - **tessera-record** - On-disk signal and numbers records, fragment export
//! - **tessera-player** - Buffering window, render callback and background worker
//!
//! The root crate adds the [`Coordinator`], the [`Renderer`] and [`Exporter`]
//! seams with in-process implementations, and the [`TesseraBuilder`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use tessera::prelude::*;
//!
//! let renderer = Arc::new(InProcessRenderer::new(Some(AudioFormat::new(
//!     48000,
//!     PcmFormat::Float32,
//!     2,
//! ))));
//! let coordinator = TesseraBuilder::new("/tmp/tessera")
//!     .renderer(renderer.clone())
//!     .build()?;
//!
//! coordinator.set_timeline(Arc::new(MemoryTimeline::new()), "song");
//! coordinator.set_playing(true);
//!
//! // From the audio callback:
//! renderer.render(&mut buffer);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - `parallel-io`
//! - `parallel-io` - Refill channels in parallel with rayon

/// Re-export of tessera-core for direct access
pub use tessera_core as core;
/// Re-export of tessera-record for direct access
pub use tessera_record as record;
/// Re-export of tessera-player for direct access
pub use tessera_player as player;

pub mod builder;
pub mod coordinator;
pub mod error;
pub mod exporter;
pub mod renderer;
pub mod timeline;

pub use builder::{Tessera, TesseraBuilder};
pub use coordinator::{Coordinator, IsPlayingHandler, Playback};
pub use error::{Error, Result};
pub use exporter::{
    Exporter, ExporterError, ExporterEvent, ExporterEventHandler, ExporterMethod, FileExporter,
};
pub use renderer::{InProcessRenderer, Renderer, RendererFormat, RendererFormatHandler};
pub use timeline::{MemoryTimeline, Timeline, TimelineContainer};

pub use tessera_core::{
    AudioFormat, ChannelIndex, ChannelMapping, FragmentIndex, FragmentRange, FrameIndex,
    NumberValue, PcmBuffer, PcmFormat, PlayingConfig, SampleData, SampleRate, SampleType,
    SubscriptionId, TimeRange,
};
pub use tessera_player::{BufferingMetrics, MetricsSnapshot, Player};
pub use tessera_record::{ChannelContent, FragmentContent};

/// Everything needed to build and drive a coordinator.
pub mod prelude {
    pub use crate::{
        AudioFormat, ChannelMapping, Coordinator, Exporter, FileExporter, InProcessRenderer,
        MemoryTimeline, PcmBuffer, PcmFormat, Renderer, SampleData, TesseraBuilder, TimeRange,
        Timeline,
    };
    pub use std::sync::Arc;
}
