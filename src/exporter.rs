//! Background export of timelines into fragment records.
//!
//! Requests are queued on a bounded channel and executed on one thread.
//! Replacing the timeline bumps a generation counter; queued or running work
//! from an older generation is dropped at the next fragment boundary.

use crate::error::{Error, Result};
use crate::timeline::TimelineContainer;
use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tessera_core::math::fragments_range;
use tessera_core::path::TimelinePath;
use tessera_core::{Notifier, SubscriptionId, TimeRange};
use tessera_record::{ExportError, FragmentExporter};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterMethod {
    /// The timeline directory was cleared for a new timeline.
    Reset,
    /// Export of the event range started.
    ExportBegan,
    /// One fragment, given by the event range, was written.
    ExportEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterError {
    RemoveFragment,
    CreateDirectory,
    WriteSignal,
    WriteNumbers,
    ContentPaths,
}

impl From<&ExportError> for ExporterError {
    fn from(error: &ExportError) -> Self {
        match error {
            ExportError::RemoveFragment(_) => ExporterError::RemoveFragment,
            ExportError::CreateDirectory(_) => ExporterError::CreateDirectory,
            ExportError::WriteSignal(_) => ExporterError::WriteSignal,
            ExportError::WriteNumbers(_) => ExporterError::WriteNumbers,
            ExportError::ContentPaths(_) => ExporterError::ContentPaths,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterEvent {
    pub result: std::result::Result<ExporterMethod, ExporterError>,
    pub range: Option<TimeRange>,
}

impl ExporterEvent {
    fn method(method: ExporterMethod, range: Option<TimeRange>) -> Self {
        Self {
            result: Ok(method),
            range,
        }
    }

    fn error(error: &ExportError, range: Option<TimeRange>) -> Self {
        Self {
            result: Err(error.into()),
            range,
        }
    }

    /// Range of a successfully exported fragment.
    pub fn exported_range(&self) -> Option<TimeRange> {
        match self.result {
            Ok(ExporterMethod::ExportEnded) => self.range,
            _ => None,
        }
    }
}

pub type ExporterEventHandler = Box<dyn Fn(&ExporterEvent) + Send + Sync>;

/// The exporter as seen by the coordinator.
pub trait Exporter: Send + Sync {
    fn set_timeline_container(&self, container: TimelineContainer);

    /// Re-exports the fragments covering `range` of the current timeline.
    fn export(&self, range: TimeRange);

    fn observe_event(&self, handler: ExporterEventHandler) -> SubscriptionId;

    fn unobserve_event(&self, id: SubscriptionId) -> bool;
}

enum ExportRequest {
    Replace {
        container: TimelineContainer,
        generation: u64,
    },
    Export {
        range: TimeRange,
        generation: u64,
    },
    Shutdown,
}

/// Writes fragment records under `root` on a dedicated thread.
pub struct FileExporter {
    root: PathBuf,
    container: ArcSwap<TimelineContainer>,
    generation: Arc<AtomicU64>,
    notifier: Arc<Notifier<ExporterEvent>>,
    request_tx: Sender<ExportRequest>,
    thread_handle: Option<JoinHandle<()>>,
}

impl FileExporter {
    /// Starts the export thread. `queue_capacity` bounds pending requests.
    pub fn new(root: impl AsRef<Path>, queue_capacity: usize) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (tx, rx) = bounded(queue_capacity.max(1));
        let generation = Arc::new(AtomicU64::new(0));
        let notifier = Arc::new(Notifier::new());

        let context = ExportContext {
            root: root.clone(),
            generation: Arc::clone(&generation),
            notifier: Arc::clone(&notifier),
            container: TimelineContainer::empty(),
            current_generation: 0,
        };

        let handle = thread::Builder::new()
            .name("tessera-exporter".into())
            .spawn(move || export_loop(rx, context))
            .map_err(Error::Spawn)?;

        debug!(root = %root.display(), "exporter started");
        Ok(Self {
            root,
            container: ArcSwap::from_pointee(TimelineContainer::empty()),
            generation,
            notifier,
            request_tx: tx,
            thread_handle: Some(handle),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn timeline_container(&self) -> Arc<TimelineContainer> {
        self.container.load_full()
    }
}

impl Exporter for FileExporter {
    fn set_timeline_container(&self, container: TimelineContainer) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.container.store(Arc::new(container.clone()));

        if self
            .request_tx
            .send(ExportRequest::Replace {
                container,
                generation,
            })
            .is_err()
        {
            warn!("exporter thread is gone, timeline not replaced");
        }
    }

    fn export(&self, range: TimeRange) {
        let request = ExportRequest::Export {
            range,
            generation: self.generation.load(Ordering::Acquire),
        };
        match self.request_tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(frame = range.frame, length = range.length, "export queue full, range dropped")
            }
            Err(TrySendError::Disconnected(_)) => warn!("exporter thread is gone, range dropped"),
        }
    }

    fn observe_event(&self, handler: ExporterEventHandler) -> SubscriptionId {
        self.notifier.subscribe(handler)
    }

    fn unobserve_event(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }
}

impl Drop for FileExporter {
    fn drop(&mut self) {
        // Cancels any running export at its next fragment.
        self.generation.fetch_add(1, Ordering::AcqRel);
        let _ = self.request_tx.send(ExportRequest::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("exporter thread panicked");
            }
        }
    }
}

/// State owned by the export thread.
struct ExportContext {
    root: PathBuf,
    generation: Arc<AtomicU64>,
    notifier: Arc<Notifier<ExporterEvent>>,
    container: TimelineContainer,
    current_generation: u64,
}

impl ExportContext {
    fn is_cancelled(&self) -> bool {
        self.generation.load(Ordering::Acquire) != self.current_generation
    }

    fn send(&self, event: ExporterEvent) {
        if let Err(result) = &event.result {
            error!(?result, range = ?event.range, "export failed");
        }
        self.notifier.notify(&event);
    }

    fn fragment_exporter(&self) -> FragmentExporter {
        FragmentExporter::new(TimelinePath::new(
            &self.root,
            self.container.identifier.clone(),
            self.container.sample_rate,
        ))
    }

    fn replace(&mut self, container: TimelineContainer, generation: u64) {
        self.container = container;
        self.current_generation = generation;

        if !self.container.is_available() || self.is_cancelled() {
            return;
        }

        let exporter = self.fragment_exporter();
        if let Err(err) = exporter.remove_all() {
            self.send(ExporterEvent::error(&err, None));
            return;
        }
        self.send(ExporterEvent::method(ExporterMethod::Reset, None));

        let Some(total_range) = self
            .container
            .timeline
            .as_ref()
            .and_then(|timeline| timeline.total_range())
        else {
            return;
        };

        let frags_range = fragments_range(total_range, self.container.sample_rate);
        self.send(ExporterEvent::method(ExporterMethod::ExportBegan, Some(frags_range)));
        self.export_fragments(&exporter, frags_range);
    }

    fn export(&mut self, range: TimeRange, generation: u64) {
        if generation != self.current_generation || !self.container.is_available() {
            return;
        }

        let sample_rate = self.container.sample_rate;
        let frags_range = fragments_range(range, sample_rate);
        self.send(ExporterEvent::method(ExporterMethod::ExportBegan, Some(frags_range)));

        let exporter = self.fragment_exporter();
        if let Err(err) = exporter.remove_fragments(range.fragments(sample_rate)) {
            self.send(ExporterEvent::error(&err, Some(range)));
            return;
        }
        self.export_fragments(&exporter, frags_range);
    }

    fn export_fragments(&self, exporter: &FragmentExporter, frags_range: TimeRange) {
        let Some(timeline) = self.container.timeline.as_ref() else {
            return;
        };
        let sample_rate = self.container.sample_rate;
        let fragments = frags_range.fragments(sample_rate);

        for fragment_index in fragments.index..fragments.next_index() {
            if self.is_cancelled() {
                debug!(fragment = fragment_index, "export cancelled");
                return;
            }

            let range = TimeRange::new(fragment_index * sample_rate as i64, sample_rate as u64);
            let content = timeline.fragment_content(range, sample_rate);
            match exporter.export_fragment(fragment_index, &content) {
                Ok(()) => self.send(ExporterEvent::method(ExporterMethod::ExportEnded, Some(range))),
                Err(err) => self.send(ExporterEvent::error(&err, Some(range))),
            }
        }
    }
}

fn export_loop(rx: Receiver<ExportRequest>, mut context: ExportContext) {
    while let Ok(request) = rx.recv() {
        match request {
            ExportRequest::Replace {
                container,
                generation,
            } => context.replace(container, generation),
            ExportRequest::Export { range, generation } => context.export(range, generation),
            ExportRequest::Shutdown => break,
        }
    }
    debug!("exporter stopped");
}
