//! State shared by the main thread, the render callback and the worker.
//!
//! The main thread always takes locks. The render side only ever
//! `try_lock`s and skips the work for this cycle when the lock is busy;
//! pending requests stay queued until a later cycle drains them.

use crate::buffering::{Buffering, BufferingResource};
use crate::reading::{Reading, ReadingResource};
use parking_lot::Mutex;
use std::sync::Arc;
use tessera_core::{AtomicFlag, AtomicFrame, AtomicState, ElementAddress, FrameIndex, PlayingConfig, StateRepr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SeekState {
    Waiting = 0,
    Requested = 1,
    Pulled = 2,
}

impl StateRepr for SeekState {
    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => SeekState::Requested,
            2 => SeekState::Pulled,
            _ => SeekState::Waiting,
        }
    }
}

#[derive(Debug, Default)]
struct OverwriteQueue {
    requests: Vec<ElementAddress>,
    is_overwritten: bool,
}

pub struct PlayerResource {
    reading: Arc<dyn Reading>,
    buffering: Arc<dyn Buffering>,

    is_playing: AtomicFlag,
    current_frame: AtomicFrame,

    seek_frame: Mutex<Option<FrameIndex>>,
    seek_state: AtomicState<SeekState>,

    overwrite: Mutex<OverwriteQueue>,
}

impl PlayerResource {
    pub fn new(reading: Arc<dyn Reading>, buffering: Arc<dyn Buffering>) -> Self {
        Self {
            reading,
            buffering,
            is_playing: AtomicFlag::new(false),
            current_frame: AtomicFrame::new(0),
            seek_frame: Mutex::new(None),
            seek_state: AtomicState::new(SeekState::Waiting),
            overwrite: Mutex::new(OverwriteQueue::default()),
        }
    }

    /// Disk-backed resources configured from `config`.
    pub fn with_config(config: &PlayingConfig) -> Self {
        Self::new(
            Arc::new(ReadingResource::new()),
            Arc::new(BufferingResource::with_config(config)),
        )
    }

    pub fn reading(&self) -> &Arc<dyn Reading> {
        &self.reading
    }

    pub fn buffering(&self) -> &Arc<dyn Buffering> {
        &self.buffering
    }

    pub fn set_playing_on_main(&self, is_playing: bool) {
        self.is_playing.set(is_playing);
    }

    pub fn is_playing_on_render(&self) -> bool {
        self.is_playing.get()
    }

    pub fn seek_on_main(&self, frame: FrameIndex) {
        let mut seek_frame = self.seek_frame.lock();
        *seek_frame = Some(frame);
        self.seek_state.store(SeekState::Requested);
    }

    /// Takes a pending seek. `None` when nothing is pending or the lock is busy.
    pub fn pull_seek_frame_on_render(&self) -> Option<FrameIndex> {
        let mut seek_frame = self.seek_frame.try_lock()?;
        let frame = seek_frame.take()?;
        self.seek_state.store(SeekState::Pulled);
        Some(frame)
    }

    /// True from `seek_on_main` until render reports the new position.
    pub fn is_seeking_on_main(&self) -> bool {
        self.seek_state.load() != SeekState::Waiting
    }

    pub fn set_current_frame_on_render(&self, frame: FrameIndex) {
        if let Some(_guard) = self.seek_frame.try_lock() {
            let _ = self.seek_state.transition(SeekState::Pulled, SeekState::Waiting);
        }
        self.current_frame.set(frame);
    }

    pub fn current_frame(&self) -> FrameIndex {
        self.current_frame.get()
    }

    pub fn add_overwrite_request_on_main(&self, address: ElementAddress) {
        let mut queue = self.overwrite.lock();
        if queue.is_overwritten {
            queue.requests.clear();
            queue.is_overwritten = false;
        }
        queue.requests.push(address);
    }

    /// Hands the queued batch to `handler` once, if the lock is free.
    pub fn perform_overwrite_requests_on_render(&self, handler: &mut dyn FnMut(&[ElementAddress])) {
        let Some(mut queue) = self.overwrite.try_lock() else {
            return;
        };
        if queue.is_overwritten {
            return;
        }
        handler(&queue.requests);
        queue.is_overwritten = true;
    }

    /// Drops the queued batch without applying it, if the lock is free.
    pub fn reset_overwrite_requests_on_render(&self) {
        if let Some(mut queue) = self.overwrite.try_lock() {
            queue.is_overwritten = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::FragmentRange;

    fn resource() -> PlayerResource {
        PlayerResource::with_config(&PlayingConfig::with_root("/tmp/tessera-unused"))
    }

    fn address(index: i64) -> ElementAddress {
        ElementAddress {
            file_channel_index: None,
            fragment_range: FragmentRange::new(index, 1),
        }
    }

    #[test]
    fn test_playing_flag() {
        let resource = resource();
        assert!(!resource.is_playing_on_render());
        resource.set_playing_on_main(true);
        assert!(resource.is_playing_on_render());
    }

    #[test]
    fn test_seek_lifecycle() {
        let resource = resource();
        assert!(!resource.is_seeking_on_main());
        assert_eq!(resource.pull_seek_frame_on_render(), None);

        resource.seek_on_main(480);
        assert!(resource.is_seeking_on_main());

        assert_eq!(resource.pull_seek_frame_on_render(), Some(480));
        assert_eq!(resource.pull_seek_frame_on_render(), None);
        assert!(resource.is_seeking_on_main());

        resource.set_current_frame_on_render(480);
        assert!(!resource.is_seeking_on_main());
        assert_eq!(resource.current_frame(), 480);
    }

    #[test]
    fn test_seek_pull_skips_when_locked() {
        let resource = resource();
        resource.seek_on_main(100);

        {
            let _held = resource.seek_frame.lock();
            assert_eq!(resource.pull_seek_frame_on_render(), None);
            resource.set_current_frame_on_render(5);
            assert_eq!(resource.current_frame(), 5);
        }

        assert_eq!(resource.pull_seek_frame_on_render(), Some(100));
    }

    #[test]
    fn test_pulled_seek_waits_for_free_lock() {
        let resource = resource();
        resource.seek_on_main(100);
        assert_eq!(resource.pull_seek_frame_on_render(), Some(100));

        {
            let _held = resource.seek_frame.lock();
            resource.set_current_frame_on_render(100);
            assert!(resource.is_seeking_on_main());
        }

        resource.set_current_frame_on_render(101);
        assert!(!resource.is_seeking_on_main());
    }

    #[test]
    fn test_overwrite_batch_consumed_once() {
        let resource = resource();
        resource.add_overwrite_request_on_main(address(1));
        resource.add_overwrite_request_on_main(address(2));

        let mut seen = Vec::new();
        resource.perform_overwrite_requests_on_render(&mut |batch| seen.extend_from_slice(batch));
        resource.perform_overwrite_requests_on_render(&mut |batch| seen.extend_from_slice(batch));
        assert_eq!(seen, vec![address(1), address(2)]);

        resource.add_overwrite_request_on_main(address(3));
        seen.clear();
        resource.perform_overwrite_requests_on_render(&mut |batch| seen.extend_from_slice(batch));
        assert_eq!(seen, vec![address(3)]);
    }

    #[test]
    fn test_overwrite_skipped_when_locked() {
        let resource = resource();
        resource.add_overwrite_request_on_main(address(1));

        let mut calls = 0;
        {
            let _held = resource.overwrite.lock();
            resource.perform_overwrite_requests_on_render(&mut |_| calls += 1);
            resource.reset_overwrite_requests_on_render();
        }
        assert_eq!(calls, 0);

        resource.perform_overwrite_requests_on_render(&mut |_| calls += 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_reset_discards_batch() {
        let resource = resource();
        resource.add_overwrite_request_on_main(address(1));
        resource.reset_overwrite_requests_on_render();

        let mut calls = 0;
        resource.perform_overwrite_requests_on_render(&mut |_| calls += 1);
        assert_eq!(calls, 0);

        resource.add_overwrite_request_on_main(address(2));
        let mut seen = Vec::new();
        resource.perform_overwrite_requests_on_render(&mut |batch| seen.extend_from_slice(batch));
        assert_eq!(seen, vec![address(2)]);
    }
}
