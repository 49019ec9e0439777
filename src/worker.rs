use crate::codec::Codec;
use crate::config::ContextConfig;
use crate::dispatcher::Dispatcher;
use crate::error::ContextError;
use crate::task::{Task, TaskKind};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use task_queue::{BlockingQueue, QueueState};
use tracing::{debug, error, trace, warn};

/// Lifecycle of a worker. Transitions only ever move forward:
/// `Starting -> Running -> ShuttingDown -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WorkerState {
    Starting = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Starting,
            1 => WorkerState::Running,
            2 => WorkerState::ShuttingDown,
            _ => WorkerState::Stopped,
        }
    }
}

/// Counters returned by the worker thread when it exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub compressed: u64,
    pub decompressed: u64,
    pub failed: u64,
}

impl WorkerStats {
    fn record(&mut self, kind: TaskKind, ok: bool) {
        match kind {
            TaskKind::Compress => self.compressed += 1,
            TaskKind::Decompress => self.decompressed += 1,
        }

        if !ok {
            self.failed += 1;
        }
    }
}

pub(crate) struct StateCell {
    raw: AtomicU8,

    /// Set when nobody will join the thread, so the thread marks itself `Stopped` on exit
    detached: AtomicBool,
}

impl StateCell {
    fn new() -> Self {
        StateCell {
            raw: AtomicU8::new(WorkerState::Starting as u8),
            detached: AtomicBool::new(false),
        }
    }

    pub(crate) fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.raw.load(Ordering::Acquire))
    }

    /// Move forward to `next`; a request to move backwards is ignored.
    fn advance(&self, next: WorkerState) {
        let prev = WorkerState::from_u8(self.raw.fetch_max(next as u8, Ordering::AcqRel));

        if prev < next {
            debug!(from = ?prev, to = ?next, "worker state changed");
        }
    }
}

/// One queue bound to one thread that drains it.
pub(crate) struct Worker<T> {
    queue: Arc<BlockingQueue<Task<T>>>,
    state: Arc<StateCell>,
    handle: JoinHandle<WorkerStats>,
}

impl<T: Send + 'static> Worker<T> {
    pub(crate) fn start(
        config: &ContextConfig,
        codec: Arc<dyn Codec>,
    ) -> Result<Self, ContextError> {
        let queue = Arc::new(BlockingQueue::new());
        let state = Arc::new(StateCell::new());
        let dispatcher = Dispatcher::new(codec, config.sink_chunk_size);

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }

        let handle = {
            let queue = Arc::clone(&queue);
            let state = Arc::clone(&state);
            builder.spawn(move || run_loop(&queue, &state, &dispatcher))?
        };

        debug!(thread = %config.thread_name, "worker spawned");

        Ok(Worker {
            queue,
            state,
            handle,
        })
    }

    pub(crate) fn push(&self, task: Task<T>) {
        self.queue.push(task);
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.reported_len()
    }

    pub(crate) fn state_cell(&self) -> Arc<StateCell> {
        Arc::clone(&self.state)
    }

    /// Queue the shutdown sentinel behind everything already submitted, wait for the thread to get
    /// there, then free the queue. Returns `None` when called from the worker thread itself: the
    /// thread cannot join itself, so it is left to finish the backlog and exit on its own.
    pub(crate) fn shutdown(self) -> Option<WorkerStats> {
        let on_worker = self.handle.thread().id() == thread::current().id();
        if on_worker {
            // the loop is parked in a callback on this very thread, it reads the flag once the
            // sentinel comes round
            self.state.detached.store(true, Ordering::Release);
        }

        self.state.advance(WorkerState::ShuttingDown);
        self.queue.push(Task::Shutdown);

        if on_worker {
            warn!("context released from its own worker thread, detaching instead of joining");
            return None;
        }

        let stats = match self.handle.join() {
            Ok(stats) => stats,
            Err(_) => {
                error!("worker thread panicked");
                WorkerStats::default()
            }
        };

        // the thread's clone went away with it, so this is the last reference
        match Arc::try_unwrap(self.queue) {
            Ok(queue) => {
                let leftover = queue.drain_and_destroy();
                if leftover > 0 {
                    warn!(leftover, "discarded tasks queued behind the shutdown sentinel");
                }
            }
            Err(_) => error!("task queue still shared after the worker joined"),
        }

        self.state.advance(WorkerState::Stopped);
        debug!(?stats, "worker stopped");

        Some(stats)
    }
}

fn run_loop<T>(
    queue: &BlockingQueue<Task<T>>,
    state: &StateCell,
    dispatcher: &Dispatcher,
) -> WorkerStats {
    state.advance(WorkerState::Running);

    let mut stats = WorkerStats::default();

    loop {
        let (kind, job) = match queue.pop() {
            Task::Compress(job) => (TaskKind::Compress, job),
            Task::Decompress(job) => (TaskKind::Decompress, job),
            Task::Shutdown => break,
        };

        trace!(?kind, len = job.payload.len(), "task picked up");

        let (destination, envelope) = dispatcher.dispatch(kind, job);
        stats.record(kind, envelope.is_ok());

        // a misbehaving callback must not take the queue down with it
        if panic::catch_unwind(AssertUnwindSafe(|| destination.deliver(envelope))).is_err() {
            warn!(?kind, "result delivery panicked");
        }
    }

    if state.detached.load(Ordering::Acquire) {
        state.advance(WorkerState::Stopped);
        debug!(?stats, "detached worker stopped");
    }

    stats
}
