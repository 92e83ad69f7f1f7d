//! Ties the player resource to a render host and a background worker.
//!
//! The render handler only flips states and copies cached samples. All
//! allocation and disk reads happen in the two worker tasks registered here.

use crate::buffering::{Buffering, RenderingState, SetupState};
use crate::error::{Error, Result};
use crate::metrics::BufferingMetrics;
use crate::reading::ReadingState;
use crate::resource::PlayerResource;
use crate::utils;
use crate::worker::{TaskResult, Worker};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use tessera_core::{
    ChannelIndex, ChannelMapping, ElementAddress, FragmentRange, FrameIndex, ObservableValue,
    PcmBuffer, PlayingConfig, SubscriptionId,
};
use tracing::{debug, error};

/// Called once per render cycle with the non-interleaved output buffer.
pub type RenderingHandler = Box<dyn FnMut(&mut PcmBuffer) + Send>;

/// Something that drives a [`RenderingHandler`] from its audio callback.
pub trait RenderHost: Send + Sync {
    /// Installs `handler`, or detaches the current one with `None`.
    fn set_rendering_handler(&self, handler: Option<RenderingHandler>);
}

/// Worker priorities of the player tasks. Setup must run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPriority {
    pub setup: u32,
    pub rendering: u32,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self {
            setup: 0,
            rendering: 1,
        }
    }
}

pub struct Player {
    resource: Arc<PlayerResource>,
    host: Arc<dyn RenderHost>,
    worker: Mutex<Worker>,
    metrics: Option<Arc<BufferingMetrics>>,
    identifier: Mutex<String>,
    channel_mapping: Mutex<ChannelMapping>,
    is_playing: ObservableValue<bool>,
}

impl Player {
    pub fn new(
        host: Arc<dyn RenderHost>,
        worker: Worker,
        priority: TaskPriority,
        resource: Arc<PlayerResource>,
    ) -> Result<Self> {
        if priority.rendering <= priority.setup {
            return Err(Error::InvalidPriority {
                setup: priority.setup,
                rendering: priority.rendering,
            });
        }

        let setup_resource = Arc::clone(&resource);
        worker.add_task(priority.setup, Box::new(move || setup_task(&setup_resource)));

        let buffering = Arc::clone(resource.buffering());
        worker.add_task(priority.rendering, Box::new(move || rendering_task(buffering.as_ref())));

        let render_resource = Arc::clone(&resource);
        host.set_rendering_handler(Some(Box::new(move |out: &mut PcmBuffer| {
            if let Err(err) = render(&render_resource, out) {
                error!(%err, "render cycle failed");
            }
        })));

        let buffering = resource.buffering();
        buffering.set_identifier_request_on_main(String::new());
        buffering.set_channel_mapping_request_on_main(ChannelMapping::default());

        let is_playing = ObservableValue::new(false);
        let playing_resource = Arc::clone(&resource);
        is_playing.subscribe(move |is_playing: &bool| playing_resource.set_playing_on_main(*is_playing), true);

        Ok(Self {
            resource,
            host,
            worker: Mutex::new(worker),
            metrics: None,
            identifier: Mutex::new(String::new()),
            channel_mapping: Mutex::new(ChannelMapping::default()),
            is_playing,
        })
    }

    /// Disk-backed player reading from `config.root_path`.
    ///
    /// The worker is not started; call [`start`](Self::start) or drive it
    /// with [`run_worker_once`](Self::run_worker_once).
    pub fn with_config(config: &PlayingConfig, host: Arc<dyn RenderHost>) -> Result<Self> {
        config.validate()?;

        let buffering = Arc::new(crate::BufferingResource::with_config(config));
        let metrics = buffering.metrics();
        let resource = Arc::new(PlayerResource::new(
            Arc::new(crate::ReadingResource::new()),
            buffering,
        ));
        let worker = Worker::new("tessera-player", config.worker_idle_sleep, config.worker_priority);

        let mut player = Self::new(host, worker, TaskPriority::default(), resource)?;
        player.metrics = Some(metrics);
        Ok(player)
    }

    pub fn start(&self) -> Result<()> {
        self.worker.lock().start()
    }

    pub fn stop(&self) {
        self.worker.lock().stop();
    }

    /// Runs one worker cycle on the calling thread.
    pub fn run_worker_once(&self) -> bool {
        self.worker.lock().run_once()
    }

    pub fn resource(&self) -> &Arc<PlayerResource> {
        &self.resource
    }

    pub fn metrics(&self) -> Option<Arc<BufferingMetrics>> {
        self.metrics.clone()
    }

    pub fn set_identifier(&self, identifier: impl Into<String>) {
        let identifier = identifier.into();
        *self.identifier.lock() = identifier.clone();
        self.resource.buffering().set_identifier_request_on_main(identifier);
    }

    pub fn set_channel_mapping(&self, channel_mapping: ChannelMapping) {
        *self.channel_mapping.lock() = channel_mapping.clone();
        self.resource
            .buffering()
            .set_channel_mapping_request_on_main(channel_mapping);
    }

    pub fn set_playing(&self, is_playing: bool) {
        self.is_playing.set(is_playing);
    }

    pub fn seek(&self, frame: FrameIndex) {
        self.resource.seek_on_main(frame);
    }

    /// Invalidates cached fragments in `fragment_range`. `None` targets every channel.
    pub fn overwrite(&self, file_channel_index: Option<ChannelIndex>, fragment_range: FragmentRange) {
        self.resource.add_overwrite_request_on_main(ElementAddress {
            file_channel_index,
            fragment_range,
        });
    }

    pub fn identifier(&self) -> String {
        self.identifier.lock().clone()
    }

    pub fn channel_mapping(&self) -> ChannelMapping {
        self.channel_mapping.lock().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing.get()
    }

    pub fn is_seeking(&self) -> bool {
        self.resource.is_seeking_on_main()
    }

    pub fn current_frame(&self) -> FrameIndex {
        self.resource.current_frame()
    }

    pub fn observe_is_playing(
        &self,
        handler: impl Fn(&bool) + Send + Sync + 'static,
        sync: bool,
    ) -> SubscriptionId {
        self.is_playing.subscribe(handler, sync)
    }

    pub fn unobserve_is_playing(&self, id: SubscriptionId) -> bool {
        self.is_playing.unsubscribe(id)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.host.set_rendering_handler(None);
        self.worker.lock().stop();
        debug!("player dropped");
    }
}

fn setup_task(resource: &PlayerResource) -> TaskResult {
    let mut result = TaskResult::Unprocessed;

    let reading = resource.reading();
    if reading.state() == ReadingState::Creating {
        if let Err(err) = reading.create_buffer_on_task() {
            error!(%err, "failed to create reading buffer");
        }
        thread::yield_now();
        result = TaskResult::Processed;
    }

    let buffering = resource.buffering();
    if buffering.setup_state() == SetupState::Creating {
        if let Err(err) = buffering.create_buffer_on_task() {
            error!(%err, "failed to create buffering channels");
        }
        thread::yield_now();
        result = TaskResult::Processed;
    }

    result
}

fn rendering_task(buffering: &dyn Buffering) -> TaskResult {
    match buffering.rendering_state() {
        RenderingState::Waiting => TaskResult::Unprocessed,
        RenderingState::AllWriting => {
            if let Err(err) = buffering.write_all_elements_on_task() {
                error!(%err, "failed to write all elements");
            }
            TaskResult::Processed
        }
        RenderingState::Advancing => {
            if buffering.write_elements_if_needed_on_task() {
                TaskResult::Processed
            } else {
                TaskResult::Unprocessed
            }
        }
    }
}

/// One render cycle. Returns early while any buffer is still being prepared.
fn render(resource: &PlayerResource, out: &mut PcmBuffer) -> Result<()> {
    let format = *out.format();
    let sample_rate = format.sample_rate;
    let pcm_format = format.pcm_format;
    let out_length = out.frame_length() as u32;
    let channel_count = out.channel_count();

    if sample_rate == 0 || out_length == 0 || channel_count == 0 {
        return Ok(());
    }

    let reading = resource.reading();
    match reading.state() {
        ReadingState::Initial => {
            return reading.set_creating_on_render(sample_rate, pcm_format, out_length);
        }
        ReadingState::Creating => return Ok(()),
        ReadingState::Rendering => {}
    }
    if reading.needs_create_on_render(sample_rate, pcm_format, out_length)? {
        return reading.set_creating_on_render(sample_rate, pcm_format, out_length);
    }

    let buffering = resource.buffering();
    match buffering.setup_state() {
        SetupState::Initial => {
            return buffering.set_creating_on_render(sample_rate, pcm_format, channel_count);
        }
        SetupState::Creating => return Ok(()),
        SetupState::Rendering => {}
    }
    if buffering.needs_create_on_render(sample_rate, pcm_format, channel_count)? {
        return buffering.set_creating_on_render(sample_rate, pcm_format, channel_count);
    }

    let rendering_state = buffering.rendering_state();
    if rendering_state == RenderingState::AllWriting {
        return Ok(());
    }

    let seek_frame = resource.pull_seek_frame_on_render();
    let needs_all_writing = buffering.needs_all_writing_on_render()?;
    if rendering_state == RenderingState::Waiting || seek_frame.is_some() || needs_all_writing {
        resource.reset_overwrite_requests_on_render();
        let frame = match seek_frame {
            Some(frame) => {
                resource.set_current_frame_on_render(frame);
                frame
            }
            None => resource.current_frame(),
        };
        return buffering.set_all_writing_on_render(frame);
    }

    let mut overwrite_result = Ok(());
    resource.perform_overwrite_requests_on_render(&mut |requests| {
        for request in requests {
            if let Err(err) = buffering.overwrite_element_on_render(request) {
                overwrite_result = Err(err);
            }
        }
    });
    overwrite_result?;

    if !resource.is_playing_on_render() {
        return Ok(());
    }

    let mut result = Ok(());
    reading.with_buffer_on_render(&mut |reading_buffer| {
        result = render_frames(resource, buffering.as_ref(), reading_buffer, out);
    });
    result
}

/// Copies cached frames into `out` one fragment-bounded chunk at a time.
///
/// Stops at the first cache miss without moving the play position, so the
/// same frames are retried on the next cycle.
fn render_frames(
    resource: &PlayerResource,
    buffering: &dyn Buffering,
    reading_buffer: &mut PcmBuffer,
    out: &mut PcmBuffer,
) -> Result<()> {
    let fragment_length = buffering.fragment_length_on_render();
    if fragment_length == 0 {
        return Ok(());
    }

    let begin_frame = resource.current_frame();
    let next_frame = begin_frame + out.frame_length() as FrameIndex;
    let channel_count = out.channel_count().min(buffering.channel_count_on_render());
    let mut current_frame = begin_frame;

    while current_frame < next_frame {
        let process_length = utils::process_length(current_frame, next_frame, fragment_length);
        let to_frame = (current_frame - begin_frame) as usize;

        for channel in 0..channel_count {
            reading_buffer.clear();
            reading_buffer.set_frame_length(process_length as usize)?;

            if !buffering.read_into_buffer_on_render(reading_buffer, channel, current_frame)? {
                return Ok(());
            }

            out.copy_channel_from(reading_buffer, channel, to_frame, process_length as usize)?;
        }

        if let Some(fragment_index) =
            utils::advancing_fragment_index(current_frame, process_length, fragment_length)
        {
            buffering.advance_on_render(fragment_index)?;
        }

        current_frame += process_length as FrameIndex;
        resource.set_current_frame_on_render(current_frame);
    }

    Ok(())
}
