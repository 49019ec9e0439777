//! Error types for the codec worker.
//!
//! Errors come in three classes. [`ContextError`] is a setup failure the caller must handle before
//! it has a context at all. [`SubmissionError`] rejects a task synchronously, before it is queued.
//! [`TaskError`] is produced on the worker thread and only ever travels inside a
//! [`ResultEnvelope`](crate::ResultEnvelope) to the task's destination.

use sink_buffer::SinkError;
use thiserror::Error;

/// Failure to bring a context up.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The operating system refused to start the worker thread.
    #[error("failed to create context: unable to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A task refused at submission time. Nothing was queued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The context is being torn down and accepts no more work.
    #[error("context is shutting down")]
    Closed,

    /// The payload exceeds the configured size limit.
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Why a single task failed. The `Display` text is the reason string delivered to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("compression failed")]
    Compression,

    #[error("data is not compressed")]
    NotCompressed,

    #[error("decompression failed")]
    Decompression,

    #[error("allocation failed")]
    Allocation,
}

/// Failure of a blocking call made through `compress_sync`/`decompress_sync`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error(transparent)]
    Rejected(#[from] SubmissionError),

    #[error(transparent)]
    Failed(#[from] TaskError),

    /// The worker went away without answering.
    #[error("worker stopped before replying")]
    NoReply,
}

/// Failures reported by a [`Codec`](crate::Codec) implementation.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input does not start with a valid frame header.
    #[error("input is not a valid frame")]
    NotFramed,

    /// The header was fine but the body did not decode to the announced length.
    #[error("corrupt frame body: {0}")]
    Corrupt(String),

    #[error("compressor error: {0}")]
    Compress(String),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Result type alias for context setup.
pub type Result<T> = std::result::Result<T, ContextError>;
