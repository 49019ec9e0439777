use crate::codec::{Codec, DeflateCodec};
use crate::config::ContextConfig;
use crate::error::{CallError, ContextError, SubmissionError};
use crate::task::{Destination, Job, ResultEnvelope, Task, TaskKind};
use crate::worker::{StateCell, Worker, WorkerState, WorkerStats};
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

struct Shared<T: Send + 'static> {
    /// `None` once teardown has started
    worker: Mutex<Option<Worker<T>>>,
    state: Arc<StateCell>,
    max_payload_len: Option<usize>,
    name: String,
}

impl<T: Send + 'static> Shared<T> {
    fn teardown(worker: Worker<T>, name: &str) -> Option<WorkerStats> {
        let stats = worker.shutdown();

        if let Some(stats) = stats {
            info!(
                context = name,
                compressed = stats.compressed,
                decompressed = stats.decompressed,
                failed = stats.failed,
                "context released"
            );
        }

        stats
    }
}

impl<T: Send + 'static> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            Shared::teardown(worker, &self.name);
        }
    }
}

/// A handle to one compression context: a queue plus the worker thread draining it.
///
/// Handles are cheap to clone and share between threads. The context is torn down exactly once,
/// either explicitly through [`Context::close`] or when the last handle is dropped; teardown lets
/// every task submitted before it run and deliver its result, then joins the worker.
///
/// `T` is the correlation token type: whatever the caller needs to match a result to its request.
pub struct Context<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Clone for Context<T> {
    fn clone(&self) -> Self {
        Context {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Create a context with the default configuration and the DEFLATE codec.
pub fn create_context<T: Send + 'static>() -> Result<Context<T>, ContextError> {
    Context::new(ContextConfig::default())
}

/// Create a context with an explicit configuration and codec.
pub fn create_context_with<T, C>(
    config: ContextConfig,
    codec: C,
) -> Result<Context<T>, ContextError>
where
    T: Send + 'static,
    C: Codec,
{
    Context::with_codec(config, Arc::new(codec))
}

/// Give up this handle. When it is the last one, this blocks until the worker has drained its
/// queue and exited, and returns `true`.
pub fn release_context<T: Send + 'static>(context: Context<T>) -> bool {
    match Arc::try_unwrap(context.shared) {
        Ok(shared) => {
            drop(shared);
            true
        }
        Err(_) => false,
    }
}

impl<T: Send + 'static> Context<T> {
    pub fn new(config: ContextConfig) -> Result<Self, ContextError> {
        let codec = DeflateCodec::new(config.level);
        Context::with_codec(config, Arc::new(codec))
    }

    pub fn with_codec(config: ContextConfig, codec: Arc<dyn Codec>) -> Result<Self, ContextError> {
        let worker = Worker::start(&config, codec)?;
        let state = worker.state_cell();

        debug!(context = %config.thread_name, "context created");

        Ok(Context {
            shared: Arc::new(Shared {
                worker: Mutex::new(Some(worker)),
                state,
                max_payload_len: config.max_payload_len,
                name: config.thread_name,
            }),
        })
    }

    /// Queue a task and return immediately. The result is delivered later to `destination`,
    /// carrying `token`. Errors here mean the task was never queued.
    pub fn submit(
        &self,
        kind: TaskKind,
        payload: impl Into<Vec<u8>>,
        destination: impl Into<Destination<T>>,
        token: T,
    ) -> Result<(), SubmissionError> {
        let payload = payload.into();

        if let Some(max) = self.shared.max_payload_len {
            if payload.len() > max {
                return Err(SubmissionError::PayloadTooLarge {
                    len: payload.len(),
                    max,
                });
            }
        }

        let job = Job {
            payload,
            destination: destination.into(),
            token,
        };

        // holding the lock across the push orders this task ahead of any shutdown sentinel
        let guard = self.shared.worker.lock();
        match guard.as_ref() {
            Some(worker) => {
                worker.push(Task::new(kind, job));
                Ok(())
            }
            None => Err(SubmissionError::Closed),
        }
    }

    pub fn compress(
        &self,
        payload: impl Into<Vec<u8>>,
        destination: impl Into<Destination<T>>,
        token: T,
    ) -> Result<(), SubmissionError> {
        self.submit(TaskKind::Compress, payload, destination, token)
    }

    pub fn decompress(
        &self,
        payload: impl Into<Vec<u8>>,
        destination: impl Into<Destination<T>>,
        token: T,
    ) -> Result<(), SubmissionError> {
        self.submit(TaskKind::Decompress, payload, destination, token)
    }

    /// Submit and wait for this task's own result.
    ///
    /// Must not be called from a result callback: the worker would wait on itself.
    pub fn call(
        &self,
        kind: TaskKind,
        payload: impl Into<Vec<u8>>,
        token: T,
    ) -> Result<Vec<u8>, CallError> {
        let (tx, rx) = bounded::<ResultEnvelope<T>>(1);
        self.submit(kind, payload, tx, token)?;

        let envelope = rx.recv().map_err(|_| CallError::NoReply)?;
        let (_, result) = envelope.into_result();

        Ok(result?)
    }

    pub fn compress_sync(
        &self,
        payload: impl Into<Vec<u8>>,
        token: T,
    ) -> Result<Vec<u8>, CallError> {
        self.call(TaskKind::Compress, payload, token)
    }

    pub fn decompress_sync(
        &self,
        payload: impl Into<Vec<u8>>,
        token: T,
    ) -> Result<Vec<u8>, CallError> {
        self.call(TaskKind::Decompress, payload, token)
    }

    /// Backlog waiting for the worker, as reported by the queue. Observational only.
    pub fn pending(&self) -> usize {
        self.shared
            .worker
            .lock()
            .as_ref()
            .map_or(0, |worker| worker.pending())
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state.get()
    }

    /// Begin teardown now, on behalf of every handle. Work already queued still runs; later
    /// submissions through any handle fail with `SubmissionError::Closed`. Blocks until the
    /// worker has stopped and returns its counters, or `None` if the context was already closed
    /// (or this is called from the worker thread, which cannot wait for itself).
    pub fn close(&self) -> Option<WorkerStats> {
        let worker = self.shared.worker.lock().take()?;
        Shared::teardown(worker, &self.shared.name)
    }

    /// Number of live handles to this context.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }
}
