//! Deterministic on-disk locations for cached fragments.
//!
//! ```text
//! root/<identifier>_<sample_rate>/<channel_index>/<fragment_index>/{signal_*, numbers}
//! ```

use crate::sample::SampleType;
use crate::types::{ChannelIndex, FragmentIndex, SampleRate, TimeRange};
use std::path::{Path, PathBuf};

/// File name of the numbers record inside a fragment directory.
pub const NUMBERS_FILE_NAME: &str = "numbers";
/// Prefix of every signal record file name.
pub const SIGNAL_FILE_PREFIX: &str = "signal";

pub fn timeline_name(identifier: &str, sample_rate: SampleRate) -> String {
    format!("{identifier}_{sample_rate}")
}

pub fn channel_name(channel_index: ChannelIndex) -> String {
    channel_index.to_string()
}

pub fn fragment_name(fragment_index: FragmentIndex) -> String {
    fragment_index.to_string()
}

/// `signal_<frame>_<length>_<code>`
pub fn signal_file_name(range: TimeRange, sample_type: SampleType) -> String {
    format!(
        "{SIGNAL_FILE_PREFIX}_{}_{}_{}",
        range.frame,
        range.length,
        sample_type.code()
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimelinePath {
    pub root: PathBuf,
    pub identifier: String,
    pub sample_rate: SampleRate,
}

impl TimelinePath {
    pub fn new(root: impl AsRef<Path>, identifier: impl Into<String>, sample_rate: SampleRate) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            identifier: identifier.into(),
            sample_rate,
        }
    }

    pub fn value(&self) -> PathBuf {
        self.root
            .join(timeline_name(&self.identifier, self.sample_rate))
    }

    pub fn channel(&self, channel_index: ChannelIndex) -> ChannelPath {
        ChannelPath {
            timeline: self.clone(),
            channel_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelPath {
    pub timeline: TimelinePath,
    pub channel_index: ChannelIndex,
}

impl ChannelPath {
    pub fn value(&self) -> PathBuf {
        self.timeline.value().join(channel_name(self.channel_index))
    }

    pub fn fragment(&self, fragment_index: FragmentIndex) -> FragmentPath {
        FragmentPath {
            channel: self.clone(),
            fragment_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentPath {
    pub channel: ChannelPath,
    pub fragment_index: FragmentIndex,
}

impl FragmentPath {
    pub fn value(&self) -> PathBuf {
        self.channel.value().join(fragment_name(self.fragment_index))
    }

    pub fn signal_event(&self, range: TimeRange, sample_type: SampleType) -> SignalEventPath {
        SignalEventPath {
            fragment: self.clone(),
            range,
            sample_type,
        }
    }

    pub fn numbers(&self) -> NumbersPath {
        NumbersPath {
            fragment: self.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalEventPath {
    pub fragment: FragmentPath,
    pub range: TimeRange,
    pub sample_type: SampleType,
}

impl SignalEventPath {
    pub fn value(&self) -> PathBuf {
        self.fragment
            .value()
            .join(signal_file_name(self.range, self.sample_type))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumbersPath {
    pub fragment: FragmentPath,
}

impl NumbersPath {
    pub fn value(&self) -> PathBuf {
        self.fragment.value().join(NUMBERS_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> TimelinePath {
        TimelinePath::new("/tmp/cache", "song", 48000)
    }

    #[test]
    fn test_timeline_value() {
        assert_eq!(timeline().value(), PathBuf::from("/tmp/cache/song_48000"));
    }

    #[test]
    fn test_nested_values() {
        let fragment = timeline().channel(1).fragment(-2);
        assert_eq!(fragment.value(), PathBuf::from("/tmp/cache/song_48000/1/-2"));
        assert_eq!(
            fragment.numbers().value(),
            PathBuf::from("/tmp/cache/song_48000/1/-2/numbers")
        );
        assert_eq!(
            fragment
                .signal_event(TimeRange::new(-96000, 48000), SampleType::Float32)
                .value(),
            PathBuf::from("/tmp/cache/song_48000/1/-2/signal_-96000_48000_f32")
        );
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(timeline().channel(0), timeline().channel(0));
        assert_ne!(timeline().channel(0), timeline().channel(1));
        assert_ne!(
            timeline().channel(0).fragment(0),
            TimelinePath::new("/tmp/cache", "song", 44100)
                .channel(0)
                .fragment(0)
        );
    }

    #[test]
    fn test_signal_file_name_bool_code() {
        assert_eq!(
            signal_file_name(TimeRange::new(0, 3), SampleType::Bool),
            "signal_0_3_b"
        );
    }
}
