//! Writing and removing whole fragment directories.

use crate::error::ExportError;
use crate::numbers_file::{self, NumberEvents};
use crate::signal_file;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tessera_core::path::TimelinePath;
use tessera_core::{ChannelIndex, FragmentIndex, FragmentRange, FrameIndex, NumberValue, SampleData, TimeRange};
use tracing::{debug, trace};

/// Events of one channel inside one fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelContent {
    pub signals: Vec<(TimeRange, SampleData)>,
    pub numbers: NumberEvents,
}

impl ChannelContent {
    /// Adds a signal run starting at `frame`; its length is the sample count.
    pub fn push_signal(&mut self, frame: FrameIndex, data: SampleData) -> &mut Self {
        let range = TimeRange::new(frame, data.len() as u64);
        self.signals.push((range, data));
        self
    }

    pub fn push_number(&mut self, frame: FrameIndex, value: NumberValue) -> &mut Self {
        self.numbers.push((frame, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty() && self.numbers.is_empty()
    }
}

/// Per-channel content of one fragment.
pub type FragmentContent = BTreeMap<ChannelIndex, ChannelContent>;

/// Writes fragment directories under one timeline directory.
#[derive(Debug, Clone)]
pub struct FragmentExporter {
    timeline: TimelinePath,
}

impl FragmentExporter {
    pub fn new(timeline: TimelinePath) -> Self {
        Self { timeline }
    }

    pub fn timeline(&self) -> &TimelinePath {
        &self.timeline
    }

    /// Replaces fragment `fragment_index` of every channel present in `content`.
    ///
    /// A channel with no events ends up with no fragment directory.
    pub fn export_fragment(
        &self,
        fragment_index: FragmentIndex,
        content: &FragmentContent,
    ) -> Result<(), ExportError> {
        for (&channel_index, channel) in content {
            let fragment_path = self.timeline.channel(channel_index).fragment(fragment_index);
            let dir = fragment_path.value();

            remove_dir_if_exists(&dir).map_err(ExportError::RemoveFragment)?;

            if channel.is_empty() {
                continue;
            }

            fs::create_dir_all(&dir).map_err(ExportError::CreateDirectory)?;

            for (range, data) in &channel.signals {
                let path = fragment_path.signal_event(*range, data.sample_type()).value();
                signal_file::write(&path, data)?;
            }

            if !channel.numbers.is_empty() {
                numbers_file::write(fragment_path.numbers().value(), &channel.numbers)?;
            }

            trace!(
                channel = channel_index,
                fragment = fragment_index,
                signals = channel.signals.len(),
                numbers = channel.numbers.len(),
                "exported fragment"
            );
        }
        Ok(())
    }

    /// Removes the fragments in `range` from every channel directory.
    ///
    /// A missing timeline directory is not an error.
    pub fn remove_fragments(&self, range: FragmentRange) -> Result<(), ExportError> {
        let timeline_dir = self.timeline.value();
        let entries = match fs::read_dir(&timeline_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(ExportError::ContentPaths(e)),
        };

        for entry in entries {
            let entry = entry.map_err(ExportError::ContentPaths)?;
            let Some(channel_index) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<ChannelIndex>().ok())
            else {
                continue;
            };

            let channel_path = self.timeline.channel(channel_index);
            for fragment_index in range.index..range.next_index() {
                remove_dir_if_exists(&channel_path.fragment(fragment_index).value())
                    .map_err(ExportError::RemoveFragment)?;
            }
        }

        debug!(index = range.index, length = range.length, "removed fragments");
        Ok(())
    }

    /// Removes the whole timeline directory.
    pub fn remove_all(&self) -> Result<(), ExportError> {
        remove_dir_if_exists(&self.timeline.value()).map_err(ExportError::RemoveFragment)
    }
}

fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
