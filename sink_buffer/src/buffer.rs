use crate::utils::{growth_for, DEFAULT_CHUNK_SIZE};
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The allocator refused to extend the backing storage.
    #[error("unable to grow the sink by {requested} bytes")]
    Allocation { requested: usize },
}

/// An append-only byte buffer that grows in coarse chunks. Producers either `append` a slice, or
/// borrow the spare region with `reserve_write_region`, write into it directly, and `commit` the
/// number of bytes they produced.
///
/// The backing vector is kept initialized up to its logical capacity, so the spare region can be
/// handed out as a plain `&mut [u8]`.
#[derive(Debug)]
pub struct GrowableSink {
    data: Vec<u8>,
    used: usize,
    chunk: usize,
}

pub trait SinkOp {
    fn reserve_write_region(&mut self, min_len: usize) -> Result<&mut [u8], SinkError>;
    fn commit(&mut self, len: usize);
    fn append(&mut self, bytes: &[u8]) -> Result<(), SinkError>;
    fn finalize(self) -> Vec<u8>;
}

pub trait SinkState {
    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn as_slice(&self) -> &[u8];

    fn spare(&self) -> usize {
        self.capacity() - self.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GrowableSink {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create an empty sink that grows by multiples of `chunk` bytes.
    pub fn with_chunk_size(chunk: usize) -> Self {
        GrowableSink {
            data: Vec::new(),
            used: 0,
            chunk: chunk.max(1),
        }
    }

    fn grow(&mut self, min_len: usize) -> Result<(), SinkError> {
        let extra = growth_for(min_len, self.chunk);

        self.data
            .try_reserve_exact(extra)
            .map_err(|_| SinkError::Allocation { requested: extra })?;

        let target = self.data.len() + extra;
        self.data.resize(target, 0);

        Ok(())
    }
}

impl Default for GrowableSink {
    fn default() -> Self {
        GrowableSink::new()
    }
}

impl SinkOp for GrowableSink {
    /// Guarantee at least `min_len` writable bytes past the cursor and return the whole spare
    /// region. Nothing becomes visible until `commit` is called.
    fn reserve_write_region(&mut self, min_len: usize) -> Result<&mut [u8], SinkError> {
        if self.used.saturating_add(min_len) > self.data.len() {
            self.grow(min_len)?;
        }

        Ok(&mut self.data[self.used..])
    }

    /// Mark `len` bytes of the spare region as written.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the spare region, since that would claim bytes nobody wrote.
    fn commit(&mut self, len: usize) {
        assert!(
            len <= self.data.len() - self.used,
            "commit of {} bytes exceeds the {} spare bytes",
            len,
            self.data.len() - self.used
        );

        self.used += len;
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let region = self.reserve_write_region(bytes.len())?;
        region[..bytes.len()].copy_from_slice(bytes);
        self.commit(bytes.len());

        Ok(())
    }

    /// Trim to the written length and hand the bytes over. Shrinking the allocation is a request
    /// to the allocator only; an oversized-but-valid vector is returned if it declines.
    fn finalize(mut self) -> Vec<u8> {
        self.data.truncate(self.used);
        self.data.shrink_to_fit();
        self.data
    }
}

impl SinkState for GrowableSink {
    fn len(&self) -> usize {
        self.used
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn as_slice(&self) -> &[u8] {
        &self.data[..self.used]
    }
}

impl io::Write for GrowableSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)
            .map_err(|err| io::Error::new(io::ErrorKind::OutOfMemory, err))?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
