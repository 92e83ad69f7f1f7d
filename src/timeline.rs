//! Timelines the exporter renders into fragment records.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tessera_core::{ChannelIndex, FrameIndex, NumberValue, SampleData, SampleRate, TimeRange};
use tessera_record::{ChannelContent, FragmentContent};

/// A source of per-channel events the exporter writes to disk.
pub trait Timeline: Send + Sync {
    /// Frames holding events, or `None` for an empty timeline.
    fn total_range(&self) -> Option<TimeRange>;

    /// Events inside `range`, keyed by file channel, with absolute frames.
    fn fragment_content(&self, range: TimeRange, sample_rate: SampleRate) -> FragmentContent;
}

/// The timeline currently handed to the exporter.
#[derive(Clone, Default)]
pub struct TimelineContainer {
    pub identifier: String,
    pub sample_rate: SampleRate,
    pub timeline: Option<Arc<dyn Timeline>>,
}

impl TimelineContainer {
    pub fn new(
        identifier: impl Into<String>,
        sample_rate: SampleRate,
        timeline: Option<Arc<dyn Timeline>>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            sample_rate,
            timeline,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there is something to export and somewhere to put it.
    pub fn is_available(&self) -> bool {
        !self.identifier.is_empty() && self.sample_rate > 0 && self.timeline.is_some()
    }
}

impl fmt::Debug for TimelineContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineContainer")
            .field("identifier", &self.identifier)
            .field("sample_rate", &self.sample_rate)
            .field("has_timeline", &self.timeline.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct Channel {
    signals: Vec<(FrameIndex, SampleData)>,
    numbers: Vec<(FrameIndex, NumberValue)>,
}

/// A timeline of fixed signal clips and number events held in memory.
///
/// Frames are absolute, so the requested sample rate is not used for
/// resampling.
#[derive(Debug, Default)]
pub struct MemoryTimeline {
    channels: RwLock<BTreeMap<ChannelIndex, Channel>>,
}

impl MemoryTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal(self, channel: ChannelIndex, frame: FrameIndex, data: SampleData) -> Self {
        self.insert_signal(channel, frame, data);
        self
    }

    pub fn with_number(self, channel: ChannelIndex, frame: FrameIndex, value: NumberValue) -> Self {
        self.insert_number(channel, frame, value);
        self
    }

    pub fn insert_signal(&self, channel: ChannelIndex, frame: FrameIndex, data: SampleData) {
        self.channels
            .write()
            .entry(channel)
            .or_default()
            .signals
            .push((frame, data));
    }

    pub fn insert_number(&self, channel: ChannelIndex, frame: FrameIndex, value: NumberValue) {
        self.channels
            .write()
            .entry(channel)
            .or_default()
            .numbers
            .push((frame, value));
    }

    /// Drops every event of `channel`. The channel keeps exporting as empty.
    pub fn clear_channel(&self, channel: ChannelIndex) {
        if let Some(channel) = self.channels.write().get_mut(&channel) {
            channel.signals.clear();
            channel.numbers.clear();
        }
    }
}

impl Timeline for MemoryTimeline {
    fn total_range(&self) -> Option<TimeRange> {
        let channels = self.channels.read();
        let mut bounds: Option<(FrameIndex, FrameIndex)> = None;
        let mut extend = |begin: FrameIndex, end: FrameIndex| {
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(begin), hi.max(end)),
                None => (begin, end),
            });
        };

        for channel in channels.values() {
            for (frame, data) in &channel.signals {
                if !data.is_empty() {
                    extend(*frame, frame + data.len() as FrameIndex);
                }
            }
            for (frame, _) in &channel.numbers {
                extend(*frame, frame + 1);
            }
        }

        bounds.map(|(begin, end)| TimeRange::new(begin, (end - begin) as u64))
    }

    fn fragment_content(&self, range: TimeRange, _sample_rate: SampleRate) -> FragmentContent {
        let channels = self.channels.read();
        let mut content = FragmentContent::new();

        for (&index, channel) in channels.iter() {
            let mut out = ChannelContent::default();

            for (frame, data) in &channel.signals {
                let begin = (*frame).max(range.frame);
                let end = (frame + data.len() as FrameIndex).min(range.next_frame());
                if begin >= end {
                    continue;
                }
                let length = (end - begin) as usize;
                let mut slice = SampleData::zeroed(data.sample_type(), length);
                if slice
                    .copy_from(data, (begin - frame) as usize, 0, length)
                    .is_ok()
                {
                    out.push_signal(begin, slice);
                }
            }

            for (frame, value) in &channel.numbers {
                if range.frame <= *frame && *frame < range.next_frame() {
                    out.push_number(*frame, *value);
                }
            }

            content.insert(index, out);
        }

        content
    }
}
