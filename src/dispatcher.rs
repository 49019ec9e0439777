use crate::codec::Codec;
use crate::error::{CodecError, TaskError};
use crate::task::{Destination, Job, ResultEnvelope, TaskKind};
use sink_buffer::{GrowableSink, SinkOp};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{trace, warn};

/// Routes a task to the codec and turns whatever happens into a `ResultEnvelope`. Nothing a codec
/// does, panics included, escapes past this point.
pub(crate) struct Dispatcher {
    codec: Arc<dyn Codec>,
    sink_chunk: usize,
}

impl Dispatcher {
    pub(crate) fn new(codec: Arc<dyn Codec>, sink_chunk: usize) -> Self {
        Dispatcher {
            codec,
            sink_chunk: sink_chunk.max(1),
        }
    }

    /// Run the codec over `payload`. A codec panic counts as a failure of the task.
    pub(crate) fn run(&self, kind: TaskKind, payload: &[u8]) -> Result<Vec<u8>, TaskError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match kind {
            TaskKind::Compress => self.compress(payload),
            TaskKind::Decompress => self.decompress(payload),
        }));

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(?kind, "codec panicked, task failed");
                Err(match kind {
                    TaskKind::Compress => TaskError::Compression,
                    TaskKind::Decompress => TaskError::Decompression,
                })
            }
        }
    }

    /// Consume the job: run it, and pair its destination with the envelope to deliver there.
    /// The payload is released here.
    pub(crate) fn dispatch<T>(
        &self,
        kind: TaskKind,
        job: Job<T>,
    ) -> (Destination<T>, ResultEnvelope<T>) {
        let Job {
            payload,
            destination,
            token,
        } = job;

        let envelope = match self.run(kind, &payload) {
            Ok(bytes) => ResultEnvelope::Ok { token, bytes },
            Err(error) => ResultEnvelope::Err { token, error },
        };

        (destination, envelope)
    }

    fn compress(&self, payload: &[u8]) -> Result<Vec<u8>, TaskError> {
        let mut sink = GrowableSink::with_chunk_size(self.sink_chunk);

        match self.codec.compress(payload, &mut sink) {
            Ok(()) => {
                let bytes = sink.finalize();
                trace!(input = payload.len(), output = bytes.len(), "compressed");
                Ok(bytes)
            }
            Err(err) => {
                warn!(error = %err, "compression failed");
                Err(TaskError::Compression)
            }
        }
    }

    fn decompress(&self, payload: &[u8]) -> Result<Vec<u8>, TaskError> {
        let len = match self.codec.uncompressed_length(payload) {
            Ok(len) => len,
            Err(CodecError::NotFramed) => return Err(TaskError::NotCompressed),
            Err(err) => {
                warn!(error = %err, "unable to read frame header");
                return Err(TaskError::NotCompressed);
            }
        };

        let mut output = Vec::new();
        if output.try_reserve_exact(len).is_err() {
            warn!(len, "unable to allocate the decompression buffer");
            return Err(TaskError::Allocation);
        }
        output.resize(len, 0);

        if let Err(err) = self.codec.raw_decompress(payload, &mut output) {
            warn!(error = %err, "decompression failed");
            return Err(TaskError::Decompression);
        }

        trace!(input = payload.len(), output = output.len(), "decompressed");
        Ok(output)
    }
}
