//! Fixtures wiring a real exporter, player and renderer over a temp cache root.
//!
//! The player worker is stepped by hand unless a test asks for the threaded
//! one; exporter events are collected on a channel so tests can wait for them.

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tessera::prelude::*;
use tessera::{ExporterEvent, ExporterMethod, FrameIndex, Tessera};

/// Sample rate of every fixture; fragments are this many frames long.
pub const TEST_SAMPLE_RATE: u32 = 8;

/// Frames rendered per cycle.
pub const TEST_BUFFER_SIZE: usize = 4;

pub const TEST_CHANNEL_COUNT: usize = 2;

pub const TEST_IDENTIFIER: &str = "song";

/// Frames of the default fixture timeline, six fragments.
pub const TEST_TIMELINE_LENGTH: usize = 48;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Never zero, so silence is distinguishable from content.
pub fn sample_value(channel: i64, frame: FrameIndex, base: f32) -> f32 {
    base + (channel * 1000 + frame + 1) as f32
}

pub fn clip(channel: i64, frames: Range<FrameIndex>, base: f32) -> SampleData {
    SampleData::Float32(
        frames
            .map(|frame| sample_value(channel, frame, base))
            .collect(),
    )
}

pub fn expected_values(channel: i64, frames: Range<FrameIndex>, base: f32) -> Vec<f32> {
    frames.map(|frame| sample_value(channel, frame, base)).collect()
}

pub fn channel_values(buffer: &PcmBuffer, channel: usize) -> Vec<f32> {
    buffer
        .channel(channel)
        .and_then(|data| data.as_f32())
        .expect("float channel")
        .to_vec()
}

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Compares an output channel against expected samples.
pub fn assert_channel(buffer: &PcmBuffer, channel: usize, expected: &[f32]) {
    let actual = channel_values(buffer, channel);
    assert_eq!(actual.len(), expected.len(), "channel {channel} length");
    for (a, e) in actual.iter().zip(expected) {
        approx::assert_relative_eq!(*a, *e, epsilon = 1e-6);
    }
}

pub fn is_silent(buffer: &PcmBuffer) -> bool {
    (0..buffer.channel_count()).all(|ch| channel_values(buffer, ch).iter().all(|&v| v == 0.0))
}

/// A two-channel timeline with one clip per channel starting at frame 0.
pub fn test_timeline() -> Arc<MemoryTimeline> {
    let end = TEST_TIMELINE_LENGTH as FrameIndex;
    Arc::new(
        MemoryTimeline::new()
            .with_signal(0, 0, clip(0, 0..end, 0.0))
            .with_signal(1, 0, clip(1, 0..end, 0.0)),
    )
}

pub struct Fixture {
    pub tessera: Tessera,
    pub timeline: Arc<MemoryTimeline>,
    pub events: Receiver<ExporterEvent>,
    pub dir: TempDir,
}

impl Fixture {
    /// Player worker stepped with [`drain_worker`](Self::drain_worker).
    pub fn new() -> Self {
        Self::build(true)
    }

    pub fn threaded() -> Self {
        Self::build(false)
    }

    fn build(manual_worker: bool) -> Self {
        init_tracing();
        let dir = TempDir::new().expect("temp dir");
        let renderer = Arc::new(InProcessRenderer::new(Some(AudioFormat::new(
            TEST_SAMPLE_RATE,
            PcmFormat::Float32,
            TEST_CHANNEL_COUNT,
        ))));

        let mut builder = TesseraBuilder::new(dir.path())
            .renderer(renderer)
            .worker_priority(false);
        if manual_worker {
            builder = builder.manual_worker();
        }
        let tessera = builder.build_parts().expect("tessera");

        let (tx, events) = crossbeam_channel::unbounded();
        tessera.exporter.observe_event(Box::new(move |event: &ExporterEvent| {
            let _ = tx.send(event.clone());
        }));

        Self {
            tessera,
            timeline: test_timeline(),
            events,
            dir,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.tessera.coordinator
    }

    /// Hands the fixture timeline to the coordinator and waits for its export.
    pub fn load_timeline(&self) {
        self.coordinator()
            .set_timeline(self.timeline.clone(), TEST_IDENTIFIER);
        self.wait_exported(TEST_TIMELINE_LENGTH / TEST_SAMPLE_RATE as usize);
    }

    pub fn next_event(&self) -> ExporterEvent {
        self.events
            .recv_timeout(EVENT_TIMEOUT)
            .expect("exporter event")
    }

    /// Collects events until `count` fragments have been exported.
    pub fn wait_exported(&self, count: usize) -> Vec<TimeRange> {
        let mut ranges = Vec::new();
        while ranges.len() < count {
            let event = self.next_event();
            assert!(event.result.is_ok(), "export failed: {event:?}");
            if event.result == Ok(ExporterMethod::ExportEnded) {
                ranges.extend(event.range);
            }
        }
        ranges
    }

    /// Runs the worker until a whole cycle processes nothing.
    pub fn drain_worker(&self) {
        for _ in 0..64 {
            if !self.tessera.player.run_worker_once() {
                return;
            }
        }
        panic!("worker never settled");
    }

    pub fn render(&self) -> PcmBuffer {
        let mut out = self
            .tessera
            .renderer
            .output_buffer(TEST_BUFFER_SIZE)
            .expect("renderer format");
        assert!(self.tessera.renderer.render(&mut out));
        out
    }

    /// Turns rendering on and alternates render and worker cycles until the window is filled.
    pub fn settle(&self) {
        self.coordinator().set_rendering(true);
        for _ in 0..4 {
            self.render();
            self.drain_worker();
        }
    }
}
