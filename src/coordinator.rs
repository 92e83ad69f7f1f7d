//! Top-level playback facade.
//!
//! The coordinator keeps the exporter's timeline container in step with the
//! active timeline and the renderer's sample rate, and turns finished
//! exports into cache overwrites on the player.

use crate::exporter::{Exporter, ExporterEvent, ExporterEventHandler, ExporterMethod};
use crate::renderer::{Renderer, RendererFormat, RendererFormatHandler};
use crate::timeline::{Timeline, TimelineContainer};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tessera_core::{
    ChannelIndex, ChannelMapping, FragmentRange, FrameIndex, PcmFormat, SampleRate,
    SubscriptionId, TimeRange,
};
use tessera_player::Player;
use tracing::{debug, info};

pub type IsPlayingHandler = Box<dyn Fn(&bool) + Send + Sync>;

/// The player as seen by the coordinator.
pub trait Playback: Send + Sync {
    fn set_identifier(&self, identifier: &str);
    fn set_channel_mapping(&self, channel_mapping: ChannelMapping);
    fn set_playing(&self, is_playing: bool);
    fn seek(&self, frame: FrameIndex);
    /// Queues a reload of `fragment_range`; `None` addresses every channel.
    fn overwrite(&self, file_channel_index: Option<ChannelIndex>, fragment_range: FragmentRange);

    fn channel_mapping(&self) -> ChannelMapping;
    fn is_playing(&self) -> bool;
    fn is_seeking(&self) -> bool;
    fn current_frame(&self) -> FrameIndex;

    fn observe_is_playing(&self, handler: IsPlayingHandler, sync: bool) -> SubscriptionId;
    fn unobserve_is_playing(&self, id: SubscriptionId) -> bool;
}

impl Playback for Player {
    fn set_identifier(&self, identifier: &str) {
        Player::set_identifier(self, identifier);
    }

    fn set_channel_mapping(&self, channel_mapping: ChannelMapping) {
        Player::set_channel_mapping(self, channel_mapping);
    }

    fn set_playing(&self, is_playing: bool) {
        Player::set_playing(self, is_playing);
    }

    fn seek(&self, frame: FrameIndex) {
        Player::seek(self, frame);
    }

    fn overwrite(&self, file_channel_index: Option<ChannelIndex>, fragment_range: FragmentRange) {
        Player::overwrite(self, file_channel_index, fragment_range);
    }

    fn channel_mapping(&self) -> ChannelMapping {
        Player::channel_mapping(self)
    }

    fn is_playing(&self) -> bool {
        Player::is_playing(self)
    }

    fn is_seeking(&self) -> bool {
        Player::is_seeking(self)
    }

    fn current_frame(&self) -> FrameIndex {
        Player::current_frame(self)
    }

    fn observe_is_playing(&self, handler: IsPlayingHandler, sync: bool) -> SubscriptionId {
        Player::observe_is_playing(self, handler, sync)
    }

    fn unobserve_is_playing(&self, id: SubscriptionId) -> bool {
        Player::unobserve_is_playing(self, id)
    }
}

#[derive(Default)]
struct ActiveTimeline {
    identifier: String,
    timeline: Option<Arc<dyn Timeline>>,
}

struct Shared {
    renderer: Arc<dyn Renderer>,
    player: Arc<dyn Playback>,
    exporter: Arc<dyn Exporter>,
    active: Mutex<ActiveTimeline>,
}

impl Shared {
    fn update_exporter(&self) {
        let container = {
            let active = self.active.lock();
            TimelineContainer::new(
                active.identifier.clone(),
                self.renderer.format().sample_rate,
                active.timeline.clone(),
            )
        };
        debug!(?container, "updating exporter timeline");
        self.exporter.set_timeline_container(container);
    }

    fn overwrite(&self, range: TimeRange) {
        let sample_rate = self.renderer.format().sample_rate;
        if sample_rate == 0 {
            debug!(frame = range.frame, length = range.length, "overwrite ignored without sample rate");
            return;
        }
        self.player.overwrite(None, range.fragments(sample_rate));
    }

    fn handle_exporter_event(&self, event: &ExporterEvent) {
        if let (Ok(ExporterMethod::ExportEnded), Some(range)) = (event.result, event.range) {
            self.overwrite(range);
        }
    }
}

/// Composes a renderer, a player and an exporter around one timeline.
pub struct Coordinator {
    shared: Arc<Shared>,
    exporter_subscription: SubscriptionId,
    format_subscription: SubscriptionId,
}

impl Coordinator {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        player: Arc<dyn Playback>,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        let shared = Arc::new(Shared {
            renderer,
            player,
            exporter,
            active: Mutex::new(ActiveTimeline::default()),
        });

        let weak: Weak<Shared> = Arc::downgrade(&shared);
        let on_event: ExporterEventHandler = Box::new(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_exporter_event(event);
            }
        });
        let exporter_subscription = shared.exporter.observe_event(on_event);

        let weak: Weak<Shared> = Arc::downgrade(&shared);
        let on_format: RendererFormatHandler = Box::new(move |_| {
            if let Some(shared) = weak.upgrade() {
                shared.update_exporter();
            }
        });
        let format_subscription = shared.renderer.observe_format(on_format, false);

        Self {
            shared,
            exporter_subscription,
            format_subscription,
        }
    }

    pub fn set_timeline(&self, timeline: Arc<dyn Timeline>, identifier: impl Into<String>) {
        let identifier = identifier.into();
        {
            let mut active = self.shared.active.lock();
            active.timeline = Some(timeline);
            active.identifier = identifier.clone();
        }
        self.shared.update_exporter();
        self.shared.player.set_identifier(&identifier);
    }

    pub fn reset_timeline(&self) {
        *self.shared.active.lock() = ActiveTimeline::default();
        self.shared.update_exporter();
        self.shared.player.set_identifier("");
    }

    /// Sets the rendering overrides. A zero sample rate follows the output.
    pub fn set_timeline_format(&self, sample_rate: SampleRate, pcm_format: Option<PcmFormat>) {
        self.shared.renderer.set_rendering_sample_rate(sample_rate);
        self.shared.renderer.set_rendering_pcm_format(pcm_format);
    }

    pub fn set_channel_mapping(&self, channel_mapping: ChannelMapping) {
        self.shared.player.set_channel_mapping(channel_mapping);
    }

    pub fn set_rendering(&self, is_rendering: bool) {
        self.shared.renderer.set_is_rendering(is_rendering);
    }

    /// Starting playback also starts rendering.
    pub fn set_playing(&self, is_playing: bool) {
        if is_playing {
            self.shared.renderer.set_is_rendering(true);
            info!("rendering started because the player was played");
        }
        self.shared.player.set_playing(is_playing);
    }

    pub fn seek(&self, frame: FrameIndex) {
        self.shared.player.seek(frame);
    }

    /// Invalidates every fragment overlapping `range` on all channels.
    pub fn overwrite(&self, range: TimeRange) {
        self.shared.overwrite(range);
    }

    pub fn identifier(&self) -> String {
        self.shared.active.lock().identifier.clone()
    }

    pub fn timeline(&self) -> Option<Arc<dyn Timeline>> {
        self.shared.active.lock().timeline.clone()
    }

    pub fn channel_mapping(&self) -> ChannelMapping {
        self.shared.player.channel_mapping()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.player.is_playing()
    }

    pub fn is_seeking(&self) -> bool {
        self.shared.player.is_seeking()
    }

    pub fn current_frame(&self) -> FrameIndex {
        self.shared.player.current_frame()
    }

    pub fn format(&self) -> RendererFormat {
        self.shared.renderer.format()
    }

    pub fn observe_format(&self, handler: RendererFormatHandler, sync: bool) -> SubscriptionId {
        self.shared.renderer.observe_format(handler, sync)
    }

    pub fn unobserve_format(&self, id: SubscriptionId) -> bool {
        self.shared.renderer.unobserve_format(id)
    }

    pub fn observe_is_playing(&self, handler: IsPlayingHandler, sync: bool) -> SubscriptionId {
        self.shared.player.observe_is_playing(handler, sync)
    }

    pub fn unobserve_is_playing(&self, id: SubscriptionId) -> bool {
        self.shared.player.unobserve_is_playing(id)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shared.exporter.unobserve_event(self.exporter_subscription);
        self.shared.renderer.unobserve_format(self.format_subscription);
    }
}
