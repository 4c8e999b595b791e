//! Reusable per-encode buffers.
//!
//! An [`EncoderBuffer`] carries everything an encode allocates and can keep
//! between calls: the five filter rows, the previous row, the zlib stream
//! and the IDAT staging buffer. An [`Encoder`](super::Encoder) with a pool
//! acquires one at the start of a call and releases it at the end, whether
//! or not the call succeeded.

use std::sync::Mutex;

use super::filter::ScratchBuffers;
use super::idat::Compressor;

/// Scratch state owned by one encode session.
#[derive(Debug, Default)]
pub struct EncoderBuffer {
    pub(crate) scratch: ScratchBuffers,
    pub(crate) compressor: Option<Compressor>,
    pub(crate) idat: Vec<u8>,
}

impl EncoderBuffer {
    /// Empty buffer. Storage is allocated on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity currently held by the raw row buffer.
    pub fn row_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    /// Whether a compressor is kept for reuse.
    pub fn has_compressor(&self) -> bool {
        self.compressor.is_some()
    }
}

/// Source of [`EncoderBuffer`]s shared between encode calls.
///
/// A buffer is never handed to two sessions at once: it leaves the pool in
/// [`acquire`](BufferPool::acquire) and comes back in
/// [`release`](BufferPool::release).
pub trait BufferPool: Send + Sync {
    /// Take a buffer, or `None` to let the encoder allocate a fresh one.
    fn acquire(&self) -> Option<EncoderBuffer>;

    /// Return a buffer after an encode call.
    fn release(&self, buffer: EncoderBuffer);
}

/// Mutex-guarded free list of buffers.
#[derive(Debug, Default)]
pub struct SharedBufferPool {
    free: Mutex<Vec<EncoderBuffer>>,
    max_idle: Option<usize>,
}

impl SharedBufferPool {
    /// Unbounded pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool that keeps at most `max_idle` buffers; extra releases are dropped.
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle: Some(max_idle),
        }
    }

    /// Number of buffers waiting in the pool.
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EncoderBuffer>> {
        // A panic while holding the lock cannot leave the list inconsistent.
        self.free.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BufferPool for SharedBufferPool {
    fn acquire(&self) -> Option<EncoderBuffer> {
        self.lock().pop()
    }

    fn release(&self, buffer: EncoderBuffer) {
        let mut free = self.lock();
        if self.max_idle.is_some_and(|max| free.len() >= max) {
            log::trace!("buffer pool full, dropping buffer");
            return;
        }
        free.push(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::CompressionLevel;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_pool_acquires_nothing() {
        let pool = SharedBufferPool::new();
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_release_then_acquire_returns_same_storage() {
        let pool = SharedBufferPool::new();
        let mut buf = EncoderBuffer::new();
        buf.scratch.prepare(1000);
        Compressor::reuse(&mut buf.compressor, CompressionLevel::BestSpeed);
        pool.release(buf);
        assert_eq!(pool.idle(), 1);

        let buf = pool.acquire().unwrap();
        assert!(buf.row_capacity() >= 1000);
        assert!(buf.has_compressor());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_max_idle_drops_extra_buffers() {
        let pool = SharedBufferPool::with_max_idle(1);
        pool.release(EncoderBuffer::new());
        pool.release(EncoderBuffer::new());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_pool_is_shared_across_threads() {
        let pool = Arc::new(SharedBufferPool::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    let buf = pool.acquire().unwrap_or_default();
                    pool.release(buf);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!((1..=4).contains(&pool.idle()));
    }
}
