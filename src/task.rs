use crate::error::TaskError;
use crossbeam_channel::Sender;
use std::fmt;
use tracing::debug;

/// What a submitted task asks the worker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Compress,
    Decompress,
}

/// A queue element. `Shutdown` is the sentinel that stops the worker; it carries nothing.
pub(crate) enum Task<T> {
    Compress(Job<T>),
    Decompress(Job<T>),
    Shutdown,
}

impl<T> Task<T> {
    pub(crate) fn new(kind: TaskKind, job: Job<T>) -> Self {
        match kind {
            TaskKind::Compress => Task::Compress(job),
            TaskKind::Decompress => Task::Decompress(job),
        }
    }
}

/// The work item proper: the input bytes, where to send the answer, and the caller's token.
pub(crate) struct Job<T> {
    pub(crate) payload: Vec<u8>,
    pub(crate) destination: Destination<T>,
    pub(crate) token: T,
}

/// The outcome of one task, echoing the caller's correlation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEnvelope<T> {
    Ok { token: T, bytes: Vec<u8> },
    Err { token: T, error: TaskError },
}

impl<T> ResultEnvelope<T> {
    pub fn token(&self) -> &T {
        match self {
            ResultEnvelope::Ok { token, .. } | ResultEnvelope::Err { token, .. } => token,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResultEnvelope::Ok { .. })
    }

    /// Human readable failure reason, if the task failed.
    pub fn message(&self) -> Option<String> {
        match self {
            ResultEnvelope::Ok { .. } => None,
            ResultEnvelope::Err { error, .. } => Some(error.to_string()),
        }
    }

    /// Split into the token and a plain `Result`.
    pub fn into_result(self) -> (T, Result<Vec<u8>, TaskError>) {
        match self {
            ResultEnvelope::Ok { token, bytes } => (token, Ok(bytes)),
            ResultEnvelope::Err { token, error } => (token, Err(error)),
        }
    }
}

type Callback<T> = Box<dyn FnOnce(ResultEnvelope<T>) + Send + 'static>;

enum Route<T> {
    Channel(Sender<ResultEnvelope<T>>),
    Callback(Callback<T>),
}

/// Where a task's result goes. Used exactly once: `deliver` consumes it.
///
/// A destination that has gone away (a dropped receiver) is not an error; the result is simply
/// discarded.
pub struct Destination<T> {
    route: Route<T>,
}

impl<T> Destination<T> {
    pub fn channel(tx: Sender<ResultEnvelope<T>>) -> Self {
        Destination {
            route: Route::Channel(tx),
        }
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(ResultEnvelope<T>) + Send + 'static,
    {
        Destination {
            route: Route::Callback(Box::new(f)),
        }
    }

    pub(crate) fn deliver(self, envelope: ResultEnvelope<T>) {
        match self.route {
            Route::Channel(tx) => {
                if tx.send(envelope).is_err() {
                    debug!("destination dropped its receiver, result discarded");
                }
            }
            Route::Callback(f) => f(envelope),
        }
    }
}

impl<T> From<Sender<ResultEnvelope<T>>> for Destination<T> {
    fn from(tx: Sender<ResultEnvelope<T>>) -> Self {
        Destination::channel(tx)
    }
}

impl<T> fmt::Debug for Destination<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.route {
            Route::Channel(_) => f.write_str("Destination::Channel"),
            Route::Callback(_) => f.write_str("Destination::Callback"),
        }
    }
}
