//! Response accumulator: collects body chunks delivered by the transport.
//!
//! One buffer per in-flight request. It only ever grows by appending, and the
//! logical length (never the capacity) is what callers see.

use crate::error::{AttestError, AttestResult};

/// Growable, append-only byte sink for a single response body.
#[derive(Debug)]
pub struct ResponseBuffer {
    data: Vec<u8>,
    limit: Option<usize>,
}

impl ResponseBuffer {
    /// Empty buffer with no size ceiling.
    pub fn new() -> Self {
        live::acquire();
        Self {
            data: Vec::new(),
            limit: None,
        }
    }

    /// Empty buffer that refuses to grow past `limit` bytes.
    pub fn with_limit(limit: Option<usize>) -> Self {
        let mut buf = Self::new();
        buf.limit = limit;
        buf
    }

    /// Append one chunk at the current logical end.
    ///
    /// Reserves exactly `chunk.len()` more bytes first. When that reservation
    /// fails (or would exceed the ceiling) nothing is written and the bytes
    /// accumulated so far stay intact; the transport is expected to abort the
    /// request on the returned [`AttestError::AllocationFailure`].
    pub fn append(&mut self, chunk: &[u8]) -> AttestResult<()> {
        if chunk.is_empty() {
            return Ok(());
        }

        let held = self.data.len();
        let starved = || AttestError::AllocationFailure {
            requested: chunk.len(),
            held,
        };

        let new_len = held.checked_add(chunk.len()).ok_or_else(starved)?;
        if self.limit.is_some_and(|limit| new_len > limit) {
            return Err(starved());
        }

        self.data.try_reserve_exact(chunk.len()).map_err(|_| starved())?;
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    /// Logical number of bytes accumulated.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Finalize, handing the bytes over to the caller.
    pub fn into_bytes(mut self) -> Vec<u8> {
        let mut data = std::mem::take(&mut self.data);
        data.shrink_to_fit();
        data
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ResponseBuffer {
    fn drop(&mut self) {
        live::release();
    }
}


#[cfg(not(test))]
mod live {
    #[inline(always)]
    pub(crate) fn acquire() {}

    #[inline(always)]
    pub(crate) fn release() {}
}
