//! Scratch buffer the render loop reads each channel into before mixing it out.

use crate::error::{Error, Result};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use tessera_core::{AtomicState, AudioFormat, PcmBuffer, PcmFormat, SampleRate, StateRepr};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadingState {
    Initial = 0,
    Creating = 1,
    Rendering = 2,
}

impl ReadingState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadingState::Initial => "initial",
            ReadingState::Creating => "creating",
            ReadingState::Rendering => "rendering",
        }
    }
}

impl StateRepr for ReadingState {
    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ReadingState::Creating,
            2 => ReadingState::Rendering,
            _ => ReadingState::Initial,
        }
    }
}

pub trait Reading: Send + Sync {
    fn state(&self) -> ReadingState;

    /// Runs `f` on the scratch buffer. False when no buffer is ready.
    fn with_buffer_on_render(&self, f: &mut dyn FnMut(&mut PcmBuffer)) -> bool;

    fn needs_create_on_render(
        &self,
        sample_rate: SampleRate,
        pcm_format: PcmFormat,
        length: u32,
    ) -> Result<bool>;

    fn set_creating_on_render(
        &self,
        sample_rate: SampleRate,
        pcm_format: PcmFormat,
        length: u32,
    ) -> Result<()>;

    fn create_buffer_on_task(&self) -> Result<()>;
}

pub struct ReadingResource {
    state: AtomicState<ReadingState>,
    sample_rate: AtomicU32,
    pcm_format: AtomicU8,
    length: AtomicU32,
    buffer: UnsafeCell<Option<PcmBuffer>>,
}

// SAFETY: `buffer` is replaced by the task context only while the state is
// `Creating`, and used by the render context only while it is `Rendering`.
// Both hand-offs are Release stores observed with Acquire.
unsafe impl Sync for ReadingResource {}

impl ReadingResource {
    pub fn new() -> Self {
        Self {
            state: AtomicState::new(ReadingState::Initial),
            sample_rate: AtomicU32::new(0),
            pcm_format: AtomicU8::new(PcmFormat::default().to_u8()),
            length: AtomicU32::new(0),
            buffer: UnsafeCell::new(None),
        }
    }
}

impl Default for ReadingResource {
    fn default() -> Self {
        Self::new()
    }
}

impl Reading for ReadingResource {
    fn state(&self) -> ReadingState {
        self.state.load()
    }

    fn with_buffer_on_render(&self, f: &mut dyn FnMut(&mut PcmBuffer)) -> bool {
        if self.state.load() != ReadingState::Rendering {
            return false;
        }
        // SAFETY: rendering, so the render context owns the buffer.
        match unsafe { &mut *self.buffer.get() } {
            Some(buffer) => {
                f(buffer);
                true
            }
            None => false,
        }
    }

    fn needs_create_on_render(
        &self,
        sample_rate: SampleRate,
        pcm_format: PcmFormat,
        length: u32,
    ) -> Result<bool> {
        let state = self.state.load();
        if state != ReadingState::Rendering {
            return Err(Error::invalid_state("needs_create_on_render", state.as_str()));
        }

        // SAFETY: rendering, so the render context owns the buffer.
        let capacity = unsafe { &*self.buffer.get() }
            .as_ref()
            .map_or(0, |buffer| buffer.frame_capacity());

        Ok(self.sample_rate.load(Ordering::Acquire) != sample_rate
            || PcmFormat::from_u8(self.pcm_format.load(Ordering::Acquire)) != pcm_format
            || capacity < length as usize)
    }

    fn set_creating_on_render(
        &self,
        sample_rate: SampleRate,
        pcm_format: PcmFormat,
        length: u32,
    ) -> Result<()> {
        let state = self.state.load();
        if state == ReadingState::Creating {
            return Err(Error::invalid_state("set_creating_on_render", state.as_str()));
        }
        if length == 0 {
            return Err(Error::InvalidFormat("reading length is zero"));
        }

        self.sample_rate.store(sample_rate, Ordering::Release);
        self.pcm_format.store(pcm_format.to_u8(), Ordering::Release);
        self.length.store(length, Ordering::Release);
        self.state.store(ReadingState::Creating);
        Ok(())
    }

    fn create_buffer_on_task(&self) -> Result<()> {
        let state = self.state.load();
        if state != ReadingState::Creating {
            return Err(Error::invalid_state("create_buffer_on_task", state.as_str()));
        }

        let sample_rate = self.sample_rate.load(Ordering::Acquire);
        let pcm_format = PcmFormat::from_u8(self.pcm_format.load(Ordering::Acquire));
        let length = self.length.load(Ordering::Acquire);

        if sample_rate == 0 {
            return Err(Error::InvalidFormat("sample rate is zero"));
        }
        if length == 0 {
            return Err(Error::InvalidFormat("reading length is zero"));
        }

        let buffer = PcmBuffer::new(AudioFormat::mono(sample_rate, pcm_format), length as usize);
        // SAFETY: creating, so the task context owns the buffer.
        unsafe { *self.buffer.get() = Some(buffer) };
        self.state.store(ReadingState::Rendering);

        debug!(sample_rate, ?pcm_format, length, "reading buffer created");
        Ok(())
    }
}
