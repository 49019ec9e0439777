//! This crate moves compression work off the caller's thread. A [`Context`] owns one worker
//! thread and the queue feeding it: callers submit compress or decompress tasks and return at
//! once, and each result comes back later, with the caller's correlation token, to the
//! [`Destination`] named at submission (a channel or a callback).
//!
//! Tasks submitted to one context complete in submission order. Releasing the last handle lets
//! everything already queued finish and deliver before the worker is joined.
//!
//! To use this crate, add the crate dependency in your project's Cargo.toml file:
//!
//! ```toml
//! [dependencies]
//! codec_worker = "0.1"
//! ```
//!
//! # Examples
//!
//! ```
//! use codec_worker::prelude::*;
//! use crossbeam_channel::unbounded;
//!
//! let ctx: Context<u32> = create_context().unwrap();
//! let (tx, rx) = unbounded();
//!
//! // Fire and forget: the result arrives on `rx`, tagged with the token `1`
//! ctx.compress(b"aaaaaaaaaa".to_vec(), tx.clone(), 1).unwrap();
//! let compressed = rx.recv().unwrap().into_result().1.unwrap();
//!
//! ctx.decompress(compressed, tx, 2).unwrap();
//! let envelope = rx.recv().unwrap();
//! assert_eq!(*envelope.token(), 2);
//! assert_eq!(envelope.into_result().1.unwrap(), b"aaaaaaaaaa".to_vec());
//!
//! // Waits for the worker to drain and exit
//! assert!(release_context(ctx));
//! ```

mod codec;
mod config;
mod context;
mod dispatcher;
mod error;
mod logging;
mod task;
mod worker;

pub use crate::codec::{Codec, DeflateCodec};
pub use crate::config::{
    ContextConfig, DEFAULT_LEVEL, DEFAULT_THREAD_NAME, ENV_LEVEL, ENV_MAX_PAYLOAD, ENV_SINK_CHUNK,
    ENV_STACK_SIZE, ENV_THREAD_NAME,
};
pub use crate::context::{create_context, create_context_with, release_context, Context};
pub use crate::error::{CallError, CodecError, ContextError, Result, SubmissionError, TaskError};
pub use crate::logging::{init_logging, DEFAULT_FILTER};
pub use crate::task::{Destination, ResultEnvelope, TaskKind};
pub use crate::worker::{WorkerState, WorkerStats};
pub use sink_buffer::{GrowableSink, SinkError, SinkOp, SinkState};

pub mod prelude {
    pub use crate::{
        create_context, create_context_with, release_context, CallError, Codec, Context,
        ContextConfig, DeflateCodec, Destination, ResultEnvelope, SubmissionError, TaskError,
        TaskKind, WorkerState,
    };
}
