//! Fixtures for driving a player without an audio device.
//!
//! [`ManualHost`] stands in for the audio callback and the worker is driven
//! with `run_worker_once`, so every render cycle is deterministic.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tessera_core::path::TimelinePath;
use tessera_core::{AudioFormat, FragmentIndex, FrameIndex, PcmBuffer, PcmFormat, SampleData};
use tessera_player::{Player, PlayingConfig, RenderHost, RenderingHandler};
use tessera_record::{FragmentContent, FragmentExporter};

/// Sample rate of every fixture; fragments are this many frames long.
pub const TEST_SAMPLE_RATE: u32 = 8;

/// Frames rendered per cycle.
pub const TEST_BUFFER_SIZE: usize = 4;

pub const TEST_IDENTIFIER: &str = "song";

/// Render host whose callback is invoked by hand.
#[derive(Default)]
pub struct ManualHost {
    handler: Mutex<Option<RenderingHandler>>,
}

impl ManualHost {
    /// Runs the installed handler. False if none is installed.
    pub fn render(&self, out: &mut PcmBuffer) -> bool {
        match self.handler.lock().as_mut() {
            Some(handler) => {
                handler(out);
                true
            }
            None => false,
        }
    }
}

impl RenderHost for ManualHost {
    fn set_rendering_handler(&self, handler: Option<RenderingHandler>) {
        *self.handler.lock() = handler;
    }
}

/// Value stored for `frame` of file channel `channel`, shifted by `base`.
pub fn sample_value(channel: i64, frame: FrameIndex, base: f32) -> f32 {
    base + (channel * 1000 + frame) as f32
}

/// Exports `fragments` of every channel in `channels` with [`sample_value`] content.
pub fn export_fragments(
    root: &Path,
    channels: &[i64],
    fragments: Range<FragmentIndex>,
    base: f32,
) {
    let exporter = FragmentExporter::new(TimelinePath::new(root, TEST_IDENTIFIER, TEST_SAMPLE_RATE));
    let length = TEST_SAMPLE_RATE as i64;

    for fragment in fragments {
        let mut content = FragmentContent::new();
        for &channel in channels {
            let begin = fragment * length;
            let values = (begin..begin + length)
                .map(|frame| sample_value(channel, frame, base))
                .collect();
            content
                .entry(channel)
                .or_default()
                .push_signal(begin, SampleData::Float32(values));
        }
        exporter
            .export_fragment(fragment, &content)
            .expect("export fragment");
    }
}

pub fn output_buffer(channel_count: usize) -> PcmBuffer {
    PcmBuffer::new(
        AudioFormat::new(TEST_SAMPLE_RATE, PcmFormat::Float32, channel_count),
        TEST_BUFFER_SIZE,
    )
}

pub fn channel_values(buffer: &PcmBuffer, channel: usize) -> Vec<f32> {
    buffer
        .channel(channel)
        .and_then(|data| data.as_f32())
        .expect("float channel")
        .to_vec()
}

pub fn expected_values(channel: i64, frames: Range<FrameIndex>, base: f32) -> Vec<f32> {
    frames.map(|frame| sample_value(channel, frame, base)).collect()
}

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A player over a temporary cache root.
pub struct Fixture {
    pub dir: TempDir,
    pub host: Arc<ManualHost>,
    pub player: Player,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let dir = TempDir::new().expect("temp dir");
        let host = Arc::new(ManualHost::default());
        let config = PlayingConfig::with_root(dir.path());
        let player = Player::with_config(&config, host.clone()).expect("player");
        player.set_identifier(TEST_IDENTIFIER);
        Self { dir, host, player }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Runs the worker until a whole cycle processes nothing.
    pub fn drain_worker(&self) {
        for _ in 0..64 {
            if !self.player.run_worker_once() {
                return;
            }
        }
        panic!("worker never settled");
    }

    /// Renders one fresh buffer and returns it.
    pub fn render(&self, channel_count: usize) -> PcmBuffer {
        let mut out = output_buffer(channel_count);
        assert!(self.host.render(&mut out));
        out
    }

    /// Alternates render and worker cycles until buffers are built and filled.
    pub fn settle(&self, channel_count: usize) {
        for _ in 0..4 {
            self.render(channel_count);
            self.drain_worker();
        }
    }
}
