//! One fragment of one channel held in memory.
//!
//! An element moves between three states:
//!
//! ```text
//! Initial ──force_write──► Readable ──advance/overwrite──► Writable
//!                             ▲                               │
//!                             └────────write_if_needed────────┘
//! ```
//!
//! The task context only touches the buffer while the element is `Initial`
//! or `Writable`; the render context only reads it while `Readable`. The
//! state store that hands the element over is the synchronization point, so
//! the buffer itself needs no lock.

use crate::error::{Error, Result};
use crate::metrics::BufferingMetrics;
use std::cell::UnsafeCell;
use std::fs;
use std::io;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tessera_core::path::ChannelPath;
use tessera_core::{AtomicState, AudioFormat, FragmentIndex, FrameIndex, PcmBuffer, StateRepr};
use tessera_record::signal_file::{self, SignalFileInfo};
use tracing::trace;

/// Lifecycle of a [`BufferingElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ElementState {
    /// No fragment assigned yet.
    Initial = 0,
    /// Owned by the task context, waiting to be filled.
    Writable = 1,
    /// Owned by the render context, holding valid data.
    Readable = 2,
}

impl ElementState {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementState::Initial => "initial",
            ElementState::Writable => "writable",
            ElementState::Readable => "readable",
        }
    }
}

impl StateRepr for ElementState {
    #[inline]
    fn to_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ElementState::Writable,
            2 => ElementState::Readable,
            _ => ElementState::Initial,
        }
    }
}

/// An element as seen by its owning channel.
pub trait FragmentElement: Send + Sync {
    fn state(&self) -> ElementState;

    /// Errors while `Initial`, since no fragment has been assigned.
    fn fragment_index_on_render(&self) -> Result<FragmentIndex>;

    /// Loads the assigned fragment if the element is waiting for data.
    ///
    /// `Ok(false)` means nothing was needed. On error the state and buffer
    /// are left as they were.
    fn write_if_needed_on_task(&self, channel_path: &ChannelPath) -> Result<bool>;

    /// Assigns `fragment_index` and loads it regardless of the current state.
    fn force_write_on_task(&self, channel_path: &ChannelPath, fragment_index: FragmentIndex) -> Result<()>;

    fn contains_frame_on_render(&self, frame: FrameIndex) -> bool;

    /// Copies `out.frame_length()` frames starting at `frame` into `out`.
    ///
    /// `Ok(false)` when the window runs past the fragment.
    fn read_into_buffer_on_render(&self, out: &mut PcmBuffer, frame: FrameIndex) -> Result<bool>;

    /// Hands a readable element back to the task context for `fragment_index`.
    fn advance_on_render(&self, fragment_index: FragmentIndex);

    /// Hands a readable element back to the task context to reload its fragment.
    fn overwrite_on_render(&self);
}

/// Production [`FragmentElement`] backed by signal records on disk.
pub struct BufferingElement {
    fragment_length: u32,
    state: AtomicState<ElementState>,
    fragment_index: AtomicI64,
    buffer: UnsafeCell<PcmBuffer>,
    /// Task-only scratch the next fragment is loaded into before it replaces `buffer`.
    staging: UnsafeCell<PcmBuffer>,
    metrics: Option<Arc<BufferingMetrics>>,
}

// SAFETY: `buffer` is mutated only by the task context while the state is
// `Initial` or `Writable`, and read only by the render context while the state
// is `Readable`. Each hand-off is a Release store observed with Acquire, so the
// two contexts never access the buffer concurrently. `staging` is task-only.
unsafe impl Sync for BufferingElement {}

impl BufferingElement {
    /// `format` must be mono; the buffer holds `fragment_length` frames.
    pub fn new(format: AudioFormat, fragment_length: u32) -> Self {
        Self {
            fragment_length,
            state: AtomicState::new(ElementState::Initial),
            fragment_index: AtomicI64::new(0),
            buffer: UnsafeCell::new(PcmBuffer::new(format, fragment_length as usize)),
            staging: UnsafeCell::new(PcmBuffer::new(format, fragment_length as usize)),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<BufferingMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn fragment_length(&self) -> u32 {
        self.fragment_length
    }

    #[cfg(test)]
    fn buffer_snapshot(&self) -> PcmBuffer {
        // SAFETY: tests call this with no task running, so nothing writes the buffer.
        unsafe { (*self.buffer.get()).clone() }
    }

    fn begin_frame(&self) -> FrameIndex {
        self.fragment_index.load(Ordering::Acquire) * self.fragment_length as FrameIndex
    }

    /// Loads the assigned fragment into `staging`, then swaps it in.
    ///
    /// Must only be called from the task context while it owns the buffer.
    fn write_on_task(&self, channel_path: &ChannelPath) -> Result<()> {
        // SAFETY: task-only field.
        let staging = unsafe { &mut *self.staging.get() };
        staging.clear();

        let fragment_index = self.fragment_index.load(Ordering::Acquire);
        let fragment_dir = channel_path.fragment(fragment_index).value();

        let bytes = match fs::read_dir(&fragment_dir) {
            Ok(entries) => {
                let sample_type = staging.format().sample_type();
                let infos = entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| SignalFileInfo::from_path(entry.path()))
                    .filter(|info| info.sample_type == sample_type);

                let top_frame = fragment_index * self.fragment_length as FrameIndex;
                let mut bytes = 0usize;
                for info in infos {
                    bytes += signal_file::read(&info, staging, top_frame)?;
                }
                bytes
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(Error::ContentPaths(e)),
        };

        // SAFETY: the caller owns the buffer in this state.
        std::mem::swap(unsafe { &mut *self.buffer.get() }, staging);

        if let Some(metrics) = &self.metrics {
            metrics.record_fragment_read(bytes as u64);
        }
        trace!(
            channel = channel_path.channel_index,
            fragment = fragment_index,
            bytes,
            "element written"
        );
        Ok(())
    }

    fn record_failure(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_read_failure();
        }
    }
}

impl FragmentElement for BufferingElement {
    fn state(&self) -> ElementState {
        self.state.load()
    }

    fn fragment_index_on_render(&self) -> Result<FragmentIndex> {
        match self.state.load() {
            ElementState::Initial => Err(Error::invalid_state(
                "fragment_index_on_render",
                ElementState::Initial.as_str(),
            )),
            _ => Ok(self.fragment_index.load(Ordering::Acquire)),
        }
    }

    fn write_if_needed_on_task(&self, channel_path: &ChannelPath) -> Result<bool> {
        if self.state.load() == ElementState::Readable {
            return Ok(false);
        }

        match self.write_on_task(channel_path) {
            Ok(()) => {
                self.state.store(ElementState::Readable);
                Ok(true)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    fn force_write_on_task(&self, channel_path: &ChannelPath, fragment_index: FragmentIndex) -> Result<()> {
        // A failed load must not leave the new index looking readable.
        if self.state.load() == ElementState::Readable {
            self.state.store(ElementState::Writable);
        }
        self.fragment_index.store(fragment_index, Ordering::Release);

        match self.write_on_task(channel_path) {
            Ok(()) => {
                self.state.store(ElementState::Readable);
                Ok(())
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    fn contains_frame_on_render(&self, frame: FrameIndex) -> bool {
        if self.state.load() != ElementState::Readable {
            return false;
        }
        let begin_frame = self.begin_frame();
        begin_frame <= frame && frame < begin_frame + self.fragment_length as FrameIndex
    }

    fn read_into_buffer_on_render(&self, out: &mut PcmBuffer, frame: FrameIndex) -> Result<bool> {
        let state = self.state.load();
        if state != ElementState::Readable {
            return Err(Error::invalid_state("read_into_buffer_on_render", state.as_str()));
        }

        // SAFETY: readable, so the render context owns the buffer.
        let buffer = unsafe { &*self.buffer.get() };

        let begin_frame = self.begin_frame();
        let from_frame = frame - begin_frame;
        let buffer_length = buffer.frame_length() as FrameIndex;
        if from_frame < 0 || buffer_length <= from_frame {
            return Ok(false);
        }
        if begin_frame + buffer_length < frame + out.frame_length() as FrameIndex {
            return Ok(false);
        }

        let length = out.frame_length();
        Ok(out.copy_from(buffer, from_frame as usize, 0, length).is_ok())
    }

    fn advance_on_render(&self, fragment_index: FragmentIndex) {
        if self.state.load() != ElementState::Readable {
            return;
        }
        self.fragment_index.store(fragment_index, Ordering::Release);
        self.state.store(ElementState::Writable);
    }

    fn overwrite_on_render(&self) {
        if self.state.load() != ElementState::Readable {
            return;
        }
        self.state.store(ElementState::Writable);
    }
}
