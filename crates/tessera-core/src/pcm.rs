//! Non-interleaved PCM buffers.

use crate::error::{Error, Result};
use crate::sample::{SampleData, SampleType};
use crate::types::SampleRate;
use serde::{Deserialize, Serialize};

/// PCM sample encoding of an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PcmFormat {
    #[default]
    Float32 = 0,
    Float64 = 1,
    Int16 = 2,
    Fixed824 = 3,
}

impl PcmFormat {
    pub fn sample_type(self) -> SampleType {
        match self {
            PcmFormat::Float32 => SampleType::Float32,
            PcmFormat::Float64 => SampleType::Float64,
            PcmFormat::Int16 => SampleType::Int16,
            PcmFormat::Fixed824 => SampleType::Int32,
        }
    }

    pub fn sample_byte_size(self) -> usize {
        self.sample_type().byte_size()
    }

    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PcmFormat::Float64,
            2 => PcmFormat::Int16,
            3 => PcmFormat::Fixed824,
            _ => PcmFormat::Float32,
        }
    }
}

/// Sample rate, encoding and channel count of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: SampleRate,
    pub pcm_format: PcmFormat,
    pub channel_count: usize,
}

impl AudioFormat {
    pub fn new(sample_rate: SampleRate, pcm_format: PcmFormat, channel_count: usize) -> Self {
        Self {
            sample_rate,
            pcm_format,
            channel_count,
        }
    }

    pub fn mono(sample_rate: SampleRate, pcm_format: PcmFormat) -> Self {
        Self::new(sample_rate, pcm_format, 1)
    }

    pub fn sample_type(&self) -> SampleType {
        self.pcm_format.sample_type()
    }
}

/// A fixed-capacity, non-interleaved audio buffer.
///
/// Capacity is allocated up front; `frame_length` selects how much of it is
/// in use and can change without allocating.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    format: AudioFormat,
    frame_capacity: usize,
    frame_length: usize,
    channels: Vec<SampleData>,
}

impl PcmBuffer {
    pub fn new(format: AudioFormat, frame_capacity: usize) -> Self {
        let channels = (0..format.channel_count)
            .map(|_| SampleData::zeroed(format.sample_type(), frame_capacity))
            .collect();
        Self {
            format,
            frame_capacity,
            frame_length: frame_capacity,
            channels,
        }
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_capacity(&self) -> usize {
        self.frame_capacity
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn set_frame_length(&mut self, frame_length: usize) -> Result<()> {
        if frame_length > self.frame_capacity {
            return Err(Error::OutOfRange {
                offset: 0,
                length: frame_length,
                capacity: self.frame_capacity,
            });
        }
        self.frame_length = frame_length;
        Ok(())
    }

    pub fn channel(&self, index: usize) -> Option<&SampleData> {
        self.channels.get(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut SampleData> {
        self.channels.get_mut(index)
    }

    /// Zeroes every sample in every channel.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
    }

    /// Copies `length` frames of every channel from `src[from_frame..]` into `self[to_frame..]`.
    pub fn copy_from(
        &mut self,
        src: &PcmBuffer,
        from_frame: usize,
        to_frame: usize,
        length: usize,
    ) -> Result<()> {
        if src.channel_count() != self.channel_count() {
            return Err(Error::InvalidFormat(format!(
                "channel count mismatch: {} into {}",
                src.channel_count(),
                self.channel_count()
            )));
        }
        check_frames(from_frame, length, src.frame_length)?;
        check_frames(to_frame, length, self.frame_length)?;
        for (dst, src) in self.channels.iter_mut().zip(&src.channels) {
            dst.copy_from(src, from_frame, to_frame, length)?;
        }
        Ok(())
    }

    /// Copies the first channel of `src` into channel `to_channel` at `to_frame`.
    pub fn copy_channel_from(
        &mut self,
        src: &PcmBuffer,
        to_channel: usize,
        to_frame: usize,
        length: usize,
    ) -> Result<()> {
        let count = self.channel_count();
        let src_channel = src.channels.first().ok_or(Error::ChannelOutOfRange {
            index: 0,
            count: 0,
        })?;
        check_frames(0, length, src.frame_length)?;
        check_frames(to_frame, length, self.frame_length)?;
        let dst = self
            .channels
            .get_mut(to_channel)
            .ok_or(Error::ChannelOutOfRange {
                index: to_channel,
                count,
            })?;
        dst.copy_from(src_channel, 0, to_frame, length)
    }

    /// Decodes raw native-endian bytes into `channel` starting at `frame`.
    pub fn write_ne_bytes(&mut self, channel: usize, frame: usize, bytes: &[u8]) -> Result<()> {
        let count = self.channel_count();
        self.channels
            .get_mut(channel)
            .ok_or(Error::ChannelOutOfRange {
                index: channel,
                count,
            })?
            .write_ne_bytes(frame, bytes)
    }
}

fn check_frames(offset: usize, length: usize, frame_length: usize) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= frame_length => Ok(()),
        _ => Err(Error::OutOfRange {
            offset,
            length,
            capacity: frame_length,
        }),
    }
}
