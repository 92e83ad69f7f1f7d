//! Tessera Core - shared types for the fragment-cached playback engine.
//!
//! Everything the record, player and coordinator layers agree on lives here:
//!
//! - **Types**: frame/fragment indices, [`FragmentRange`], [`ElementAddress`], [`TimeRange`]
//! - **Path model**: deterministic on-disk locations ([`path`])
//! - **Samples**: the closed sample type set and its storage ([`SampleType`], [`SampleData`])
//! - **PCM**: non-interleaved audio buffers ([`PcmBuffer`])
//! - **Channel mapping**: output channel to file channel indirection
//! - **Lock-free**: atomic flags and state cells for render/task coordination
//! - **Observable**: value holders with change notification

pub mod channel_mapping;
pub mod config;
pub mod error;
pub mod lockfree;
pub mod math;
pub mod observable;
pub mod path;
pub mod pcm;
pub mod sample;
pub mod types;

pub use channel_mapping::ChannelMapping;
pub use config::PlayingConfig;
pub use error::{Error, Result};
pub use lockfree::{AtomicFlag, AtomicFrame, AtomicState, StateRepr};
pub use observable::{Notifier, ObservableValue, SubscriptionId};
pub use pcm::{AudioFormat, PcmBuffer, PcmFormat};
pub use sample::{NumberValue, SampleData, SampleType};
pub use types::{
    ChannelIndex, ElementAddress, FragmentIndex, FragmentRange, FrameIndex, Length, SampleRate,
    TimeRange,
};
