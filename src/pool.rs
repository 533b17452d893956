//! A pool of reusable, growable byte buffers.
//!
//! Used wherever a response body or a decoded chunked request body needs an
//! owned allocation instead of a zero-copy slice into the connection buffer.
//! Built on [`crossbeam::queue::SegQueue`], the same unbounded MPMC queue the
//! connection-dispatch path (`server::server_impl`) already uses for its
//! stream/error queues.

use crossbeam::queue::SegQueue;
use std::sync::Arc;

/// Thread-safe pool of `Vec<u8>` buffers.
///
/// `rent` never blocks and never fails: it pops a returned buffer if one is
/// available, or allocates a fresh one at `default_capacity`. Rented buffers
/// carry whatever bytes they held from their previous use — callers that
/// care about the contents must clear or overwrite before reading.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<SegQueue<Vec<u8>>>,
    default_capacity: usize,
}

impl BufferPool {
    /// Creates an empty pool. `default_capacity` is the initial capacity of
    /// newly allocated buffers when the pool has nothing to reuse.
    #[inline]
    pub fn new(default_capacity: usize) -> Self {
        BufferPool {
            inner: Arc::new(SegQueue::new()),
            default_capacity,
        }
    }

    /// Rents a buffer, reusing a returned one when available.
    #[inline]
    pub fn rent(&self) -> PooledBuffer {
        let buffer = self
            .inner
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.default_capacity));

        PooledBuffer {
            buffer: Some(buffer),
            pool: self.inner.clone(),
        }
    }

    /// Number of idle buffers currently available for reuse.
    #[inline]
    pub fn idle_count(&self) -> usize {
        self.inner.len()
    }
}

/// A buffer rented from a [`BufferPool`]. Returned to the pool automatically
/// on drop; `take` opts out of that and hands ownership to the caller
/// instead (e.g. to move the bytes into a `Response` body without a copy).
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: Option<Vec<u8>>,
    pool: Arc<SegQueue<Vec<u8>>>,
}

impl PooledBuffer {
    /// Takes ownership of the underlying buffer, skipping the return to the
    /// pool that would otherwise happen on drop.
    #[inline]
    pub fn take(mut self) -> Vec<u8> {
        self.buffer.take().expect("buffer taken twice")
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = Vec<u8>;

    #[inline]
    fn deref(&self) -> &Vec<u8> {
        self.buffer.as_ref().expect("buffer taken twice")
    }
}

impl std::ops::DerefMut for PooledBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buffer.as_mut().expect("buffer taken twice")
    }
}

impl Drop for PooledBuffer {
    #[inline]
    fn drop(&mut self) {
        if let Some(mut buffer) = self.buffer.take() {
            buffer.clear();
            self.pool.push(buffer);
        }
    }
}
