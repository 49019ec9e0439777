/// Growth step used when the caller does not pick one.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// Number of bytes to add to the backing storage so that `wanted` more bytes fit. Small requests
/// grow by one chunk; larger ones are rounded up to the next multiple of the chunk.
#[inline]
pub(crate) fn growth_for(wanted: usize, chunk: usize) -> usize {
    if wanted <= chunk {
        return chunk;
    }

    match wanted % chunk {
        0 => wanted,
        rem => wanted.saturating_add(chunk - rem),
    }
}
