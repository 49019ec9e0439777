//! This crate provides the output buffer that a codec writes into. A [`GrowableSink`] grows in
//! coarse chunks so a compressor producing output piece by piece triggers few reallocations, and it
//! exposes its spare region directly so the codec can write in place instead of through an
//! intermediate copy.
//!
//! # Examples
//!
//! ```
//! use sink_buffer::prelude::*;
//!
//! let mut sink = GrowableSink::with_chunk_size(64);
//!
//! // Copying path
//! sink.append(b"head:").unwrap();
//!
//! // In-place path: borrow the spare region, write, then commit what was written
//! let region = sink.reserve_write_region(4).unwrap();
//! region[..4].copy_from_slice(b"body");
//! sink.commit(4);
//!
//! assert_eq!(sink.finalize(), b"head:body".to_vec());
//! ```

mod buffer;
mod utils;

pub use crate::buffer::{GrowableSink, SinkError, SinkOp, SinkState};
pub use crate::utils::DEFAULT_CHUNK_SIZE;

pub mod prelude {
    pub use crate::{GrowableSink, SinkError, SinkOp, SinkState};
}
