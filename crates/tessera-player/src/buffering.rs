//! All buffering channels plus the setup and rendering state machines.
//!
//! The render context only flips states and records what it needs; the task
//! context builds channels and performs every read.
//!
//! ```text
//! setup:      Initial ──render──► Creating ──task──► Rendering
//! rendering:  Waiting ──render──► AllWriting ──task──► Advancing
//! ```

use crate::channel::{BufferingChannel, FragmentChannel, MakeChannel};
use crate::error::{Error, Result};
use crate::metrics::BufferingMetrics;
use crate::utils;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tessera_core::path::TimelinePath;
use tessera_core::{
    AtomicFrame, AtomicState, AudioFormat, ChannelMapping, ElementAddress, FragmentIndex,
    FrameIndex, PcmBuffer, PcmFormat, PlayingConfig, SampleRate, StateRepr,
};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SetupState {
    Initial = 0,
    Creating = 1,
    Rendering = 2,
}

impl SetupState {
    pub fn as_str(self) -> &'static str {
        match self {
            SetupState::Initial => "initial",
            SetupState::Creating => "creating",
            SetupState::Rendering => "rendering",
        }
    }
}

impl StateRepr for SetupState {
    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => SetupState::Creating,
            2 => SetupState::Rendering,
            _ => SetupState::Initial,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RenderingState {
    Waiting = 0,
    AllWriting = 1,
    Advancing = 2,
}

impl RenderingState {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderingState::Waiting => "waiting",
            RenderingState::AllWriting => "all_writing",
            RenderingState::Advancing => "advancing",
        }
    }
}

impl StateRepr for RenderingState {
    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => RenderingState::AllWriting,
            2 => RenderingState::Advancing,
            _ => RenderingState::Waiting,
        }
    }
}

/// The buffering resource as seen by the player.
pub trait Buffering: Send + Sync {
    fn element_count(&self) -> usize;
    fn setup_state(&self) -> SetupState;
    fn rendering_state(&self) -> RenderingState;
    fn channel_count_on_render(&self) -> usize;
    fn fragment_length_on_render(&self) -> u32;

    /// Records the requested format and asks the task context to rebuild.
    fn set_creating_on_render(
        &self,
        sample_rate: SampleRate,
        pcm_format: PcmFormat,
        channel_count: usize,
    ) -> Result<()>;

    /// True when the built channels no longer match the requested format.
    fn needs_create_on_render(
        &self,
        sample_rate: SampleRate,
        pcm_format: PcmFormat,
        channel_count: usize,
    ) -> Result<bool>;

    fn create_buffer_on_task(&self) -> Result<()>;

    /// Asks the task context to reload every window starting at `frame`.
    fn set_all_writing_on_render(&self, frame: FrameIndex) -> Result<()>;

    fn write_all_elements_on_task(&self) -> Result<()>;

    fn advance_on_render(&self, fragment_index: FragmentIndex) -> Result<()>;

    /// Refills elements waiting for data. False outside `Advancing`.
    fn write_elements_if_needed_on_task(&self) -> bool;

    fn overwrite_element_on_render(&self, address: &ElementAddress) -> Result<()>;

    /// True when a channel mapping or identifier change is pending.
    fn needs_all_writing_on_render(&self) -> Result<bool>;

    fn set_channel_mapping_request_on_main(&self, channel_mapping: ChannelMapping);
    fn set_identifier_request_on_main(&self, identifier: String);

    /// Reads output channel `channel` at `frame` into `out`. `Ok(false)` on a cache miss.
    fn read_into_buffer_on_render(
        &self,
        out: &mut PcmBuffer,
        channel: usize,
        frame: FrameIndex,
    ) -> Result<bool>;
}

#[derive(Debug, Default)]
struct Requests {
    channel_mapping: Option<ChannelMapping>,
    identifier: Option<String>,
}

/// Production [`Buffering`] implementation.
pub struct BufferingResource {
    element_count: usize,
    root_path: PathBuf,
    make_channel: MakeChannel,
    parallel_io: bool,
    metrics: Arc<BufferingMetrics>,

    setup_state: AtomicState<SetupState>,
    rendering_state: AtomicState<RenderingState>,

    // Written on render before `Creating`, read on task after.
    sample_rate: AtomicU32,
    pcm_format: AtomicU8,
    channel_count: AtomicUsize,
    fragment_length: AtomicU32,

    all_writing_frame: AtomicFrame,

    channels: ArcSwap<Vec<Box<dyn FragmentChannel>>>,
    channel_mapping: ArcSwap<ChannelMapping>,
    /// Task-only.
    identifier: Mutex<String>,

    requests: Mutex<Requests>,
}

impl BufferingResource {
    pub fn new(element_count: usize, root_path: impl AsRef<Path>, make_channel: MakeChannel) -> Self {
        Self {
            element_count,
            root_path: root_path.as_ref().to_path_buf(),
            make_channel,
            parallel_io: false,
            metrics: Arc::new(BufferingMetrics::new()),
            setup_state: AtomicState::new(SetupState::Initial),
            rendering_state: AtomicState::new(RenderingState::Waiting),
            sample_rate: AtomicU32::new(0),
            pcm_format: AtomicU8::new(PcmFormat::default().to_u8()),
            channel_count: AtomicUsize::new(0),
            fragment_length: AtomicU32::new(0),
            all_writing_frame: AtomicFrame::new(0),
            channels: ArcSwap::from_pointee(Vec::new()),
            channel_mapping: ArcSwap::from_pointee(ChannelMapping::default()),
            identifier: Mutex::new(String::new()),
            requests: Mutex::new(Requests::default()),
        }
    }

    /// Disk-backed channels configured from `config`.
    pub fn with_config(config: &PlayingConfig) -> Self {
        let metrics = Arc::new(BufferingMetrics::new());
        let mut resource = Self::new(
            config.element_count,
            &config.root_path,
            BufferingChannel::factory(Arc::clone(&metrics)),
        );
        resource.metrics = metrics;
        resource.parallel_io = config.parallel_io;
        resource
    }

    pub fn metrics(&self) -> Arc<BufferingMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn all_writing_frame(&self) -> FrameIndex {
        self.all_writing_frame.get()
    }

    /// Mapping applied by the last all-writing pass.
    pub fn channel_mapping(&self) -> ChannelMapping {
        ChannelMapping::clone(&self.channel_mapping.load())
    }

    /// Identifier applied by the last all-writing pass.
    pub fn identifier(&self) -> String {
        self.identifier.lock().clone()
    }

    fn pull_requests_on_task(&self) -> Requests {
        match self.requests.try_lock() {
            Some(mut requests) => std::mem::take(&mut *requests),
            None => Requests::default(),
        }
    }

    fn expect_rendering_state(&self, expected: RenderingState, operation: &'static str) -> Result<()> {
        let state = self.rendering_state.load();
        if state != expected {
            return Err(Error::invalid_state(operation, state.as_str()));
        }
        Ok(())
    }

    #[cfg(feature = "parallel-io")]
    fn write_channels(&self, channels: &[Box<dyn FragmentChannel>], timeline: &TimelinePath, top: FragmentIndex) {
        use rayon::prelude::*;

        let mapping = self.channel_mapping.load_full();
        let count = channels.len();
        let write = |(index, channel): (usize, &Box<dyn FragmentChannel>)| {
            let file_index = mapping.file_index(index, count).unwrap_or(index as i64);
            channel.write_all_elements_on_task(&timeline.channel(file_index), top);
        };

        if self.parallel_io {
            channels.par_iter().enumerate().for_each(write);
        } else {
            channels.iter().enumerate().for_each(|pair| {
                write(pair);
                thread::yield_now();
            });
        }
    }

    #[cfg(not(feature = "parallel-io"))]
    fn write_channels(&self, channels: &[Box<dyn FragmentChannel>], timeline: &TimelinePath, top: FragmentIndex) {
        let mapping = self.channel_mapping.load();
        let count = channels.len();
        for (index, channel) in channels.iter().enumerate() {
            let file_index = mapping.file_index(index, count).unwrap_or(index as i64);
            channel.write_all_elements_on_task(&timeline.channel(file_index), top);
            thread::yield_now();
        }
    }
}

impl Buffering for BufferingResource {
    fn element_count(&self) -> usize {
        self.element_count
    }

    fn setup_state(&self) -> SetupState {
        self.setup_state.load()
    }

    fn rendering_state(&self) -> RenderingState {
        self.rendering_state.load()
    }

    fn channel_count_on_render(&self) -> usize {
        self.channel_count.load(Ordering::Acquire)
    }

    fn fragment_length_on_render(&self) -> u32 {
        self.fragment_length.load(Ordering::Acquire)
    }

    fn set_creating_on_render(
        &self,
        sample_rate: SampleRate,
        pcm_format: PcmFormat,
        channel_count: usize,
    ) -> Result<()> {
        let state = self.setup_state.load();
        if state == SetupState::Creating {
            return Err(Error::invalid_state("set_creating_on_render", state.as_str()));
        }

        self.sample_rate.store(sample_rate, Ordering::Release);
        self.fragment_length.store(sample_rate, Ordering::Release);
        self.pcm_format.store(pcm_format.to_u8(), Ordering::Release);
        self.channel_count.store(channel_count, Ordering::Release);
        self.setup_state.store(SetupState::Creating);
        Ok(())
    }

    fn needs_create_on_render(
        &self,
        sample_rate: SampleRate,
        pcm_format: PcmFormat,
        channel_count: usize,
    ) -> Result<bool> {
        let state = self.setup_state.load();
        if state != SetupState::Rendering {
            return Err(Error::invalid_state("needs_create_on_render", state.as_str()));
        }

        Ok(self.sample_rate.load(Ordering::Acquire) != sample_rate
            || PcmFormat::from_u8(self.pcm_format.load(Ordering::Acquire)) != pcm_format
            || self.channel_count.load(Ordering::Acquire) != channel_count)
    }

    fn create_buffer_on_task(&self) -> Result<()> {
        let state = self.setup_state.load();
        if state != SetupState::Creating {
            return Err(Error::invalid_state("create_buffer_on_task", state.as_str()));
        }

        self.channels.store(Arc::new(Vec::new()));
        thread::yield_now();

        let sample_rate = self.sample_rate.load(Ordering::Acquire);
        let fragment_length = self.fragment_length.load(Ordering::Acquire);
        let channel_count = self.channel_count.load(Ordering::Acquire);
        let pcm_format = PcmFormat::from_u8(self.pcm_format.load(Ordering::Acquire));

        if sample_rate == 0 {
            return Err(Error::InvalidFormat("sample rate is zero"));
        }
        if fragment_length == 0 {
            return Err(Error::InvalidFormat("fragment length is zero"));
        }
        if channel_count == 0 {
            return Err(Error::InvalidFormat("channel count is zero"));
        }

        let format = AudioFormat::mono(sample_rate, pcm_format);
        let channels: Vec<Box<dyn FragmentChannel>> = (0..channel_count)
            .map(|_| {
                let channel = (self.make_channel)(self.element_count, format, fragment_length);
                thread::yield_now();
                channel
            })
            .collect();
        self.channels.store(Arc::new(channels));

        self.rendering_state.store(RenderingState::Waiting);
        self.setup_state.store(SetupState::Rendering);

        debug!(
            sample_rate,
            ?pcm_format,
            channel_count,
            element_count = self.element_count,
            "buffering channels created"
        );
        Ok(())
    }

    fn set_all_writing_on_render(&self, frame: FrameIndex) -> Result<()> {
        let state = self.rendering_state.load();
        if state == RenderingState::AllWriting {
            return Err(Error::invalid_state("set_all_writing_on_render", state.as_str()));
        }

        self.all_writing_frame.set(frame);
        self.rendering_state.store(RenderingState::AllWriting);
        Ok(())
    }

    fn write_all_elements_on_task(&self) -> Result<()> {
        self.expect_rendering_state(RenderingState::AllWriting, "write_all_elements_on_task")?;

        let requests = self.pull_requests_on_task();
        if let Some(mapping) = requests.channel_mapping {
            self.channel_mapping.store(Arc::new(mapping));
        }
        let identifier = {
            let mut identifier = self.identifier.lock();
            if let Some(requested) = requests.identifier {
                *identifier = requested;
            }
            identifier.clone()
        };
        thread::yield_now();

        let sample_rate = self.sample_rate.load(Ordering::Acquire);
        let timeline = TimelinePath::new(&self.root_path, identifier, sample_rate);
        let frame = self.all_writing_frame.get();
        let top = utils::top_fragment_index(self.fragment_length.load(Ordering::Acquire), frame)
            .ok_or(Error::InvalidFormat("fragment length is zero"))?;

        let channels = self.channels.load_full();
        self.write_channels(&channels, &timeline, top);

        // Leave the state alone if it moved on while the elements were written.
        if let Err(state) = self
            .rendering_state
            .transition(RenderingState::AllWriting, RenderingState::Advancing)
        {
            debug!(state = state.as_str(), "rendering state changed during write_all");
        }

        trace!(frame, top, channels = channels.len(), "all elements written");
        Ok(())
    }

    fn advance_on_render(&self, fragment_index: FragmentIndex) -> Result<()> {
        self.expect_rendering_state(RenderingState::Advancing, "advance_on_render")?;

        for channel in self.channels.load().iter() {
            channel.advance_on_render(fragment_index);
        }
        self.metrics.record_advance();
        Ok(())
    }

    fn write_elements_if_needed_on_task(&self) -> bool {
        // Render may have moved on since the caller checked.
        if self.rendering_state.load() != RenderingState::Advancing {
            return false;
        }

        let mut written = false;
        for channel in self.channels.load().iter() {
            if channel.write_elements_if_needed_on_task() {
                written = true;
            }
            thread::yield_now();
        }
        written
    }

    fn overwrite_element_on_render(&self, address: &ElementAddress) -> Result<()> {
        self.expect_rendering_state(RenderingState::Advancing, "overwrite_element_on_render")?;

        let channels = self.channels.load();
        match address.file_channel_index {
            Some(file_index) => {
                let mapping = self.channel_mapping.load();
                if let Some(channel) = mapping
                    .out_index(file_index, channels.len())
                    .and_then(|out_index| channels.get(out_index))
                {
                    channel.overwrite_element_on_render(address.fragment_range);
                }
            }
            None => {
                for channel in channels.iter() {
                    channel.overwrite_element_on_render(address.fragment_range);
                }
            }
        }
        self.metrics.record_overwrite();
        Ok(())
    }

    fn needs_all_writing_on_render(&self) -> Result<bool> {
        let state = self.rendering_state.load();
        if state != RenderingState::Waiting && state != RenderingState::Advancing {
            return Err(Error::invalid_state("needs_all_writing_on_render", state.as_str()));
        }

        Ok(self
            .requests
            .try_lock()
            .is_some_and(|requests| requests.channel_mapping.is_some() || requests.identifier.is_some()))
    }

    fn set_channel_mapping_request_on_main(&self, channel_mapping: ChannelMapping) {
        self.requests.lock().channel_mapping = Some(channel_mapping);
    }

    fn set_identifier_request_on_main(&self, identifier: String) {
        self.requests.lock().identifier = Some(identifier);
    }

    fn read_into_buffer_on_render(
        &self,
        out: &mut PcmBuffer,
        channel: usize,
        frame: FrameIndex,
    ) -> Result<bool> {
        self.expect_rendering_state(RenderingState::Advancing, "read_into_buffer_on_render")?;

        let channels = self.channels.load();
        let Some(channel) = channels.get(channel) else {
            return Ok(false);
        };
        let read = channel.read_into_buffer_on_render(out, frame);
        if !read {
            self.metrics.record_cache_miss();
        }
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tessera_core::{FragmentRange, SampleData};
    use tessera_record::{FragmentContent, FragmentExporter};

    const SR: u32 = 4;

    /// Records calls instead of touching disk.
    #[derive(Default)]
    struct CallLog {
        calls: Mutex<Vec<String>>,
    }

    struct LoggingChannel {
        log: Arc<CallLog>,
    }

    impl FragmentChannel for LoggingChannel {
        fn write_all_elements_on_task(&self, channel_path: &tessera_core::path::ChannelPath, top: FragmentIndex) {
            self.log.calls.lock().push(format!(
                "write_all {} {} {}",
                channel_path.timeline.identifier, channel_path.channel_index, top
            ));
        }

        fn write_elements_if_needed_on_task(&self) -> bool {
            self.log.calls.lock().push("write_if_needed".into());
            true
        }

        fn advance_on_render(&self, prev: FragmentIndex) {
            self.log.calls.lock().push(format!("advance {prev}"));
        }

        fn overwrite_element_on_render(&self, range: FragmentRange) {
            self.log.calls.lock().push(format!("overwrite {} {}", range.index, range.length));
        }

        fn read_into_buffer_on_render(&self, _out: &mut PcmBuffer, frame: FrameIndex) -> bool {
            self.log.calls.lock().push(format!("read {frame}"));
            true
        }
    }

    fn logging_resource() -> (BufferingResource, Arc<CallLog>) {
        let log = Arc::new(CallLog::default());
        let factory_log = Arc::clone(&log);
        let make: MakeChannel = Arc::new(move |_, _, _| {
            Box::new(LoggingChannel {
                log: Arc::clone(&factory_log),
            })
        });
        (BufferingResource::new(3, "/cache", make), log)
    }

    fn created(resource: &BufferingResource, channel_count: usize) {
        resource
            .set_creating_on_render(SR, PcmFormat::Float32, channel_count)
            .unwrap();
        resource.create_buffer_on_task().unwrap();
    }

    #[test]
    fn test_setup_state_machine() {
        let (resource, _log) = logging_resource();
        assert_eq!(resource.setup_state(), SetupState::Initial);
        assert!(resource.needs_create_on_render(SR, PcmFormat::Float32, 2).is_err());
        assert!(resource.create_buffer_on_task().is_err());

        resource.set_creating_on_render(SR, PcmFormat::Float32, 2).unwrap();
        assert_eq!(resource.setup_state(), SetupState::Creating);
        assert!(resource.set_creating_on_render(SR, PcmFormat::Float32, 2).is_err());

        resource.create_buffer_on_task().unwrap();
        assert_eq!(resource.setup_state(), SetupState::Rendering);
        assert_eq!(resource.rendering_state(), RenderingState::Waiting);
        assert_eq!(resource.channel_count_on_render(), 2);
        assert_eq!(resource.fragment_length_on_render(), SR);

        assert!(!resource.needs_create_on_render(SR, PcmFormat::Float32, 2).unwrap());
        assert!(resource.needs_create_on_render(8, PcmFormat::Float32, 2).unwrap());
        assert!(resource.needs_create_on_render(SR, PcmFormat::Int16, 2).unwrap());
        assert!(resource.needs_create_on_render(SR, PcmFormat::Float32, 1).unwrap());
    }

    #[test]
    fn test_create_rejects_zero_format() {
        let (resource, _log) = logging_resource();
        resource.set_creating_on_render(0, PcmFormat::Float32, 2).unwrap();
        assert!(matches!(
            resource.create_buffer_on_task(),
            Err(Error::InvalidFormat(_))
        ));

        let (resource, _log) = logging_resource();
        resource.set_creating_on_render(SR, PcmFormat::Float32, 0).unwrap();
        assert!(resource.create_buffer_on_task().is_err());
    }

    #[test]
    fn test_rendering_state_machine() {
        let (resource, log) = logging_resource();
        created(&resource, 1);

        assert!(!resource.write_elements_if_needed_on_task());
        assert!(resource.write_all_elements_on_task().is_err());

        resource.set_all_writing_on_render(9).unwrap();
        assert_eq!(resource.all_writing_frame(), 9);
        assert!(resource.set_all_writing_on_render(9).is_err());
        assert!(resource.needs_all_writing_on_render().is_err());

        resource.write_all_elements_on_task().unwrap();
        assert_eq!(resource.rendering_state(), RenderingState::Advancing);
        assert!(resource.write_elements_if_needed_on_task());

        let calls = log.calls.lock().clone();
        assert_eq!(calls, vec!["write_all  0 2".to_string(), "write_if_needed".into()]);
    }

    /// Rebuilds the owning resource from inside its own write.
    struct RecreatingChannel {
        resource: Arc<Mutex<Option<std::sync::Weak<BufferingResource>>>>,
    }

    impl FragmentChannel for RecreatingChannel {
        fn write_all_elements_on_task(&self, _: &tessera_core::path::ChannelPath, _: FragmentIndex) {
            let resource = self.resource.lock().as_ref().and_then(|weak| weak.upgrade());
            if let Some(resource) = resource {
                resource.set_creating_on_render(SR, PcmFormat::Float32, 1).unwrap();
                resource.create_buffer_on_task().unwrap();
            }
        }

        fn write_elements_if_needed_on_task(&self) -> bool {
            false
        }

        fn advance_on_render(&self, _: FragmentIndex) {}

        fn overwrite_element_on_render(&self, _: FragmentRange) {}

        fn read_into_buffer_on_render(&self, _: &mut PcmBuffer, _: FrameIndex) -> bool {
            false
        }
    }

    #[test]
    fn test_write_all_keeps_state_changed_meanwhile() {
        let slot = Arc::new(Mutex::new(None));
        let factory_slot = Arc::clone(&slot);
        let make: MakeChannel = Arc::new(move |_, _, _| {
            Box::new(RecreatingChannel {
                resource: Arc::clone(&factory_slot),
            })
        });
        let resource = Arc::new(BufferingResource::new(3, "/cache", make));
        created(&resource, 1);
        *slot.lock() = Some(Arc::downgrade(&resource));

        resource.set_all_writing_on_render(0).unwrap();
        resource.write_all_elements_on_task().unwrap();

        assert_eq!(resource.setup_state(), SetupState::Rendering);
        assert_eq!(resource.rendering_state(), RenderingState::Waiting);
        assert!(!resource.write_elements_if_needed_on_task());
    }

    #[test]
    fn test_write_all_applies_requests_and_mapping() {
        let (resource, log) = logging_resource();
        created(&resource, 2);

        resource.set_identifier_request_on_main("song".into());
        resource.set_channel_mapping_request_on_main(ChannelMapping::new(vec![3]));
        assert!(resource.needs_all_writing_on_render().unwrap());

        resource.set_all_writing_on_render(-1).unwrap();
        resource.write_all_elements_on_task().unwrap();

        assert!(!resource.needs_all_writing_on_render().unwrap());
        assert_eq!(resource.identifier(), "song");
        assert_eq!(resource.channel_mapping(), ChannelMapping::new(vec![3]));
        let calls = log.calls.lock().clone();
        assert_eq!(calls, vec!["write_all song 3 -1", "write_all song 1 -1"]);
    }

    #[test]
    fn test_overwrite_maps_file_channel() {
        let (resource, log) = logging_resource();
        created(&resource, 2);
        resource.set_channel_mapping_request_on_main(ChannelMapping::new(vec![1, 0]));
        resource.set_all_writing_on_render(0).unwrap();
        resource.write_all_elements_on_task().unwrap();
        log.calls.lock().clear();

        let range = FragmentRange::new(2, 1);
        resource
            .overwrite_element_on_render(&ElementAddress {
                file_channel_index: Some(0),
                fragment_range: range,
            })
            .unwrap();
        resource
            .overwrite_element_on_render(&ElementAddress {
                file_channel_index: Some(7),
                fragment_range: range,
            })
            .unwrap();
        resource
            .overwrite_element_on_render(&ElementAddress {
                file_channel_index: None,
                fragment_range: range,
            })
            .unwrap();

        let calls = log.calls.lock().clone();
        assert_eq!(calls, vec!["overwrite 2 1", "overwrite 2 1", "overwrite 2 1"]);
    }

    #[test]
    fn test_render_operations_require_advancing() {
        let (resource, _log) = logging_resource();
        created(&resource, 1);
        let mut out = PcmBuffer::new(AudioFormat::mono(SR, PcmFormat::Float32), 1);
        assert!(resource.read_into_buffer_on_render(&mut out, 0, 0).is_err());
        assert!(resource.advance_on_render(0).is_err());
    }

    #[test]
    fn test_read_out_of_range_channel() {
        let (resource, _log) = logging_resource();
        created(&resource, 1);
        resource.set_all_writing_on_render(0).unwrap();
        resource.write_all_elements_on_task().unwrap();

        let mut out = PcmBuffer::new(AudioFormat::mono(SR, PcmFormat::Float32), 1);
        assert!(resource.read_into_buffer_on_render(&mut out, 0, 0).unwrap());
        assert!(!resource.read_into_buffer_on_render(&mut out, 1, 0).unwrap());
    }

    #[test]
    fn test_disk_backed_resource_reads_mapped_channel() {
        let dir = TempDir::new().unwrap();
        let config = PlayingConfig::with_root(dir.path());
        let resource = BufferingResource::with_config(&config);

        let exporter = FragmentExporter::new(TimelinePath::new(dir.path(), "tl", SR));
        let mut content = FragmentContent::new();
        content
            .entry(2)
            .or_default()
            .push_signal(4, SampleData::Float32(vec![0.5; 4]));
        exporter.export_fragment(1, &content).unwrap();

        created(&resource, 1);
        resource.set_identifier_request_on_main("tl".into());
        resource.set_channel_mapping_request_on_main(ChannelMapping::new(vec![2]));
        resource.set_all_writing_on_render(4).unwrap();
        resource.write_all_elements_on_task().unwrap();

        let mut out = PcmBuffer::new(AudioFormat::mono(SR, PcmFormat::Float32), 4);
        assert!(resource.read_into_buffer_on_render(&mut out, 0, 4).unwrap());
        assert_eq!(out.channel(0).unwrap().as_f32().unwrap(), &[0.5; 4]);

        let metrics = resource.metrics().snapshot();
        assert_eq!(metrics.fragments_read, 3);
        assert_eq!(metrics.bytes_read, 16);
    }
}
