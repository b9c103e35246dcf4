use super::layout::RingState;
use super::Buffer::{Dequeued, RingBuffer};
use crate::error::{ChannelError, Result};
use parking_lot::{Condvar, Mutex};

impl RingBuffer {
    /// Create a ring buffer owning `capacity` bytes of storage.
    ///
    /// Storage is reserved up front; enqueue and dequeue never allocate.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ChannelError::InvalidCapacity(
                "ring buffer capacity must be non-zero".to_string(),
            ));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| ChannelError::AllocationFailed { capacity })?;
        data.resize(capacity, 0u8);

        tracing::debug!(capacity, "ring buffer created");

        Ok(Self {
            state: Mutex::new(RingState::new(data.into_boxed_slice())),
            readable: Condvar::new(),
            writable: Condvar::new(),
            capacity,
        })
    }

    /// Total size of the buffer in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently stored.
    pub fn len(&self) -> usize {
        self.state.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// False once `disconnect` has been called.
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Enqueue one record, blocking while there is not enough free space.
    ///
    /// Returns the record's position (0 for the first enqueue, 1 for the
    /// next, ...).
    pub fn enqueue(&self, data: &[u8]) -> Result<u64> {
        self.enqueue_with(data, |_| {})
    }

    /// Enqueue one record and run `on_commit` with its position while the
    /// buffer lock is still held.
    ///
    /// The hook runs after the bytes are stored but before any consumer can
    /// observe them. It must not call back into this buffer.
    pub fn enqueue_with<F>(&self, data: &[u8], on_commit: F) -> Result<u64>
    where
        F: FnOnce(u64),
    {
        let size = data.len();
        if size > self.capacity {
            return Err(ChannelError::OversizedRecord {
                size,
                capacity: self.capacity,
            });
        }

        let mut state = self.state.lock();
        loop {
            // Disconnect does not wake producers, so this is re-read after
            // every wake-up caused by a dequeue.
            if !state.connected {
                return Err(ChannelError::Disconnected);
            }
            if state.free() >= size {
                break;
            }
            self.writable.wait(&mut state);
        }

        let position = state.push(data);
        on_commit(position);
        drop(state);

        tracing::trace!(position, size, "enqueued");
        self.readable.notify_all();
        Ok(position)
    }

    /// Dequeue one record of `out.len()` bytes, blocking while the buffer
    /// holds fewer bytes and the producer is still connected.
    ///
    /// Returns [`Dequeued::Closed`] when woken by a disconnect with too few
    /// bytes left; callers treat it as "no more work", not as a retryable
    /// failure.
    pub fn dequeue(&self, out: &mut [u8]) -> Result<Dequeued> {
        let size = out.len();
        if size > self.capacity {
            return Err(ChannelError::OversizedRecord {
                size,
                capacity: self.capacity,
            });
        }

        let mut state = self.state.lock();
        while state.len < size && state.connected {
            self.readable.wait(&mut state);
        }

        if state.len < size {
            return Ok(Dequeued::Closed);
        }

        let position = state.pop(out);
        drop(state);

        tracing::trace!(position, size, "dequeued");
        self.writable.notify_all();
        Ok(Dequeued::Record { position })
    }

    /// Mark the producer side as finished and wake every blocked consumer.
    ///
    /// Idempotent. Blocked producers are not woken.
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        if !state.connected {
            return;
        }
        state.connected = false;
        let remaining = state.len;
        drop(state);

        tracing::debug!(remaining, "ring buffer disconnected");
        self.readable.notify_all();
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_ring_buffer(self, f)
    }
}
