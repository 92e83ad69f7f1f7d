//! A rolling window of elements for one output channel.

use crate::element::{BufferingElement, FragmentElement};
use crate::metrics::BufferingMetrics;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use tessera_core::path::ChannelPath;
use tessera_core::{AudioFormat, FragmentIndex, FragmentRange, FrameIndex, PcmBuffer};
use tracing::warn;

/// A channel as seen by the buffering resource.
pub trait FragmentChannel: Send + Sync {
    /// Reassigns the window to `[top, top + N)` and loads every element.
    fn write_all_elements_on_task(&self, channel_path: &ChannelPath, top_fragment_index: FragmentIndex);

    /// Loads every element waiting for data. True if any element loaded.
    fn write_elements_if_needed_on_task(&self) -> bool;

    /// Moves the element holding `prev_fragment_index` to the end of the window.
    fn advance_on_render(&self, prev_fragment_index: FragmentIndex);

    /// Marks every element inside `range` for reload.
    fn overwrite_element_on_render(&self, range: FragmentRange);

    /// Copies from the element covering `frame`. False on a cache miss.
    fn read_into_buffer_on_render(&self, out: &mut PcmBuffer, frame: FrameIndex) -> bool;
}

/// Builds a channel from `(element_count, format, fragment_length)`.
pub type MakeChannel = Arc<dyn Fn(usize, AudioFormat, u32) -> Box<dyn FragmentChannel> + Send + Sync>;

/// Production [`FragmentChannel`] owning `N` elements.
pub struct BufferingChannel {
    elements: Vec<Box<dyn FragmentElement>>,
    /// Set by `write_all_elements_on_task`; task-only.
    channel_path: Mutex<Option<ChannelPath>>,
}

impl BufferingChannel {
    pub fn new(elements: Vec<Box<dyn FragmentElement>>) -> Self {
        Self {
            elements,
            channel_path: Mutex::new(None),
        }
    }

    /// `element_count` disk-backed elements of `fragment_length` frames.
    pub fn with_format(
        element_count: usize,
        format: AudioFormat,
        fragment_length: u32,
        metrics: Option<Arc<BufferingMetrics>>,
    ) -> Self {
        let elements = (0..element_count)
            .map(|_| {
                let element = BufferingElement::new(format, fragment_length);
                let element = match &metrics {
                    Some(metrics) => element.with_metrics(Arc::clone(metrics)),
                    None => element,
                };
                Box::new(element) as Box<dyn FragmentElement>
            })
            .collect();
        Self::new(elements)
    }

    /// Channel factory sharing one metrics sink.
    pub fn factory(metrics: Arc<BufferingMetrics>) -> MakeChannel {
        Arc::new(move |element_count, format, fragment_length| {
            Box::new(Self::with_format(
                element_count,
                format,
                fragment_length,
                Some(Arc::clone(&metrics)),
            ))
        })
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn elements(&self) -> &[Box<dyn FragmentElement>] {
        &self.elements
    }

    pub fn channel_path(&self) -> Option<ChannelPath> {
        self.channel_path.lock().clone()
    }
}

impl FragmentChannel for BufferingChannel {
    fn write_all_elements_on_task(&self, channel_path: &ChannelPath, top_fragment_index: FragmentIndex) {
        *self.channel_path.lock() = Some(channel_path.clone());

        for (offset, element) in self.elements.iter().enumerate() {
            let fragment_index = top_fragment_index + offset as FragmentIndex;
            if let Err(err) = element.force_write_on_task(channel_path, fragment_index) {
                warn!(
                    channel = channel_path.channel_index,
                    fragment = fragment_index,
                    %err,
                    "failed to write element"
                );
            }
            thread::yield_now();
        }
    }

    fn write_elements_if_needed_on_task(&self) -> bool {
        let Some(channel_path) = self.channel_path.lock().clone() else {
            return false;
        };

        let mut written = false;
        for element in &self.elements {
            match element.write_if_needed_on_task(&channel_path) {
                Ok(true) => written = true,
                Ok(false) => {}
                Err(err) => warn!(channel = channel_path.channel_index, %err, "failed to refill element"),
            }
        }
        written
    }

    fn advance_on_render(&self, prev_fragment_index: FragmentIndex) {
        let next_fragment_index = prev_fragment_index + self.elements.len() as FragmentIndex;
        for element in &self.elements {
            if element.fragment_index_on_render().ok() == Some(prev_fragment_index) {
                element.advance_on_render(next_fragment_index);
            }
        }
    }

    fn overwrite_element_on_render(&self, range: FragmentRange) {
        for element in &self.elements {
            if let Ok(fragment_index) = element.fragment_index_on_render() {
                if range.contains(fragment_index) {
                    element.overwrite_on_render();
                }
            }
        }
    }

    fn read_into_buffer_on_render(&self, out: &mut PcmBuffer, frame: FrameIndex) -> bool {
        self.elements
            .iter()
            .find(|element| element.contains_frame_on_render(frame))
            .is_some_and(|element| element.read_into_buffer_on_render(out, frame).unwrap_or(false))
    }
}
