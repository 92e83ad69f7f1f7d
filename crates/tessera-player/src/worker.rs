//! Background task thread.
//!
//! Tasks run in ascending priority order. Whenever one reports
//! [`TaskResult::Processed`] the cycle restarts from the first task, so
//! setup work always finishes before rendering work resumes. A cycle in
//! which nothing was processed ends with a short sleep.

use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tessera_core::{AtomicState, StateRepr};
use thread_priority::ThreadPriority;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    /// Work was done; restart the cycle.
    Processed,
    Unprocessed,
}

pub type WorkerTask = Box<dyn FnMut() -> TaskResult + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerCommand {
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum WorkerState {
    #[default]
    Running = 0,
    Stopped = 1,
}

impl StateRepr for WorkerState {
    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => WorkerState::Stopped,
            _ => WorkerState::Running,
        }
    }
}

struct TaskEntry {
    priority: u32,
    task: WorkerTask,
}

type TaskList = Arc<Mutex<Vec<TaskEntry>>>;

pub struct Worker {
    name: String,
    idle_sleep: Duration,
    raise_priority: bool,
    tasks: TaskList,
    command_tx: Sender<WorkerCommand>,
    command_rx: Option<Receiver<WorkerCommand>>,
    shutdown: Arc<AtomicBool>,
    state: Arc<AtomicState<WorkerState>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn new(name: impl Into<String>, idle_sleep: Duration, raise_priority: bool) -> Self {
        let (tx, rx) = bounded(16);
        Self {
            name: name.into(),
            idle_sleep,
            raise_priority,
            tasks: Arc::new(Mutex::new(Vec::new())),
            command_tx: tx,
            command_rx: Some(rx),
            shutdown: Arc::new(AtomicBool::new(false)),
            state: Arc::new(AtomicState::new(WorkerState::Running)),
            thread_handle: None,
        }
    }

    /// Registers `task`; lower `priority` runs first. Equal priorities keep insertion order.
    pub fn add_task(&self, priority: u32, task: WorkerTask) {
        let mut tasks = self.tasks.lock();
        let position = tasks.partition_point(|entry| entry.priority <= priority);
        tasks.insert(position, TaskEntry { priority, task });
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn state(&self) -> WorkerState {
        self.state.load()
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    /// Runs one cycle on the calling thread. True if any task was processed.
    pub fn run_once(&self) -> bool {
        run_cycle(&self.tasks)
    }

    pub fn start(&mut self) -> Result<()> {
        if self.thread_handle.is_some() {
            return Ok(());
        }
        let Some(rx) = self.command_rx.take() else {
            warn!(worker = %self.name, "worker cannot be restarted after stop");
            return Ok(());
        };

        let tasks = Arc::clone(&self.tasks);
        let shutdown = Arc::clone(&self.shutdown);
        let state = Arc::clone(&self.state);
        let idle_sleep = self.idle_sleep;
        let raise_priority = self.raise_priority;
        let name = self.name.clone();

        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                if raise_priority {
                    if let Err(err) = thread_priority::set_current_thread_priority(ThreadPriority::Max) {
                        debug!(worker = %name, ?err, "could not raise worker priority");
                    }
                }
                worker_loop(rx, tasks, shutdown, state, idle_sleep);
            })
            .map_err(Error::Spawn)?;

        debug!(worker = %self.name, "worker started");
        self.thread_handle = Some(handle);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.command_tx.try_send(WorkerCommand::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!(worker = %self.name, "worker thread panicked");
            }
            debug!(worker = %self.name, "worker stopped");
        }
        self.state.store(WorkerState::Stopped);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_cycle(tasks: &Mutex<Vec<TaskEntry>>) -> bool {
    let mut tasks = tasks.lock();
    for entry in tasks.iter_mut() {
        if (entry.task)() == TaskResult::Processed {
            return true;
        }
    }
    false
}

fn worker_loop(
    rx: Receiver<WorkerCommand>,
    tasks: TaskList,
    shutdown: Arc<AtomicBool>,
    state: Arc<AtomicState<WorkerState>>,
    idle_sleep: Duration,
) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        match rx.try_recv() {
            Ok(WorkerCommand::Shutdown) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        if !run_cycle(&tasks) {
            thread::sleep(idle_sleep);
        }
    }

    state.store(WorkerState::Stopped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_run_once_respects_priority() {
        let worker = Worker::new("test-worker", Duration::from_millis(1), false);
        let order = Arc::new(Mutex::new(Vec::new()));

        for (priority, label) in [(2, "c"), (0, "a"), (1, "b")] {
            let order = Arc::clone(&order);
            worker.add_task(
                priority,
                Box::new(move || {
                    order.lock().push(label);
                    TaskResult::Unprocessed
                }),
            );
        }

        assert!(!worker.run_once());
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_processed_task_restarts_cycle() {
        let worker = Worker::new("test-worker", Duration::from_millis(1), false);
        let later = Arc::new(AtomicUsize::new(0));

        let mut remaining = 2;
        worker.add_task(
            0,
            Box::new(move || {
                if remaining > 0 {
                    remaining -= 1;
                    TaskResult::Processed
                } else {
                    TaskResult::Unprocessed
                }
            }),
        );
        let counter = Arc::clone(&later);
        worker.add_task(
            1,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                TaskResult::Unprocessed
            }),
        );

        assert!(worker.run_once());
        assert!(worker.run_once());
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert!(!worker.run_once());
        assert_eq!(later.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_thread_runs_tasks_until_stopped() {
        let mut worker = Worker::new("test-worker", Duration::from_millis(1), false);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        worker.add_task(
            0,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                TaskResult::Unprocessed
            }),
        );

        worker.start().unwrap();
        assert!(worker.is_running());
        assert!(wait_until(|| count.load(Ordering::SeqCst) >= 3));

        worker.stop();
        assert!(!worker.is_running());
        assert_eq!(worker.state(), WorkerState::Stopped);
        let stopped_at = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), stopped_at);
    }

    #[test]
    fn test_worker_does_not_restart_after_stop() {
        let mut worker = Worker::new("test-worker", Duration::from_millis(1), false);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        worker.add_task(
            0,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                TaskResult::Unprocessed
            }),
        );
        assert_eq!(worker.task_count(), 1);
        assert_eq!(worker.state(), WorkerState::Running);

        worker.start().unwrap();
        worker.stop();
        assert_eq!(worker.state(), WorkerState::Stopped);

        worker.start().unwrap();
        assert!(!worker.is_running());
        let stopped_at = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), stopped_at);
    }
}
