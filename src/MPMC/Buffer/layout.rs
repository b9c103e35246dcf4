/// The mutable state of one ring buffer: backing bytes plus cursors.
///
/// Every field is only touched while the owning
/// [`RingBuffer`](super::RingBuffer)'s mutex is held, so the wrap-around copy
/// in `push`/`pop` is never interleaved with another mutation.
///
/// Invariant at every point where the lock is released:
/// `len <= data.len()` and `write_pos == (read_pos + len) % data.len()`.
pub struct RingState {
    /// Backing storage, allocated once at construction.
    pub(crate) data: Box<[u8]>,

    /// Offset of the next byte to read.
    pub(crate) read_pos: usize,

    /// Offset of the next byte to write.
    pub(crate) write_pos: usize,

    /// Number of bytes currently occupied.
    pub(crate) len: usize,

    /// Producer-alive flag. Cleared once by `disconnect`.
    pub(crate) connected: bool,

    /// Number of completed enqueue calls; the next record's position.
    pub(crate) enqueued: u64,

    /// Number of completed dequeue calls; the next record's position.
    pub(crate) dequeued: u64,
}

impl RingState {
    pub(crate) fn new(data: Box<[u8]>) -> Self {
        Self {
            data,
            read_pos: 0,
            write_pos: 0,
            len: 0,
            connected: true,
            enqueued: 0,
            dequeued: 0,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub(crate) fn free(&self) -> usize {
        self.capacity() - self.len
    }

    /// Copy `src` in at `write_pos`, wrapping at the end of storage.
    /// Caller has checked `src.len() <= self.free()`.
    pub(crate) fn push(&mut self, src: &[u8]) -> u64 {
        debug_assert!(src.len() <= self.free());
        let cap = self.capacity();
        let first = src.len().min(cap - self.write_pos);
        let (head, tail) = src.split_at(first);

        self.data[self.write_pos..self.write_pos + first].copy_from_slice(head);
        self.data[..tail.len()].copy_from_slice(tail);

        self.write_pos = (self.write_pos + src.len()) % cap;
        self.len += src.len();

        let position = self.enqueued;
        self.enqueued += 1;
        position
    }

    /// Copy `dst.len()` bytes out from `read_pos`, wrapping at the end of
    /// storage. Caller has checked `dst.len() <= self.len`.
    pub(crate) fn pop(&mut self, dst: &mut [u8]) -> u64 {
        debug_assert!(dst.len() <= self.len);
        let cap = self.capacity();
        let size = dst.len();
        let first = size.min(cap - self.read_pos);
        let (head, tail) = dst.split_at_mut(first);

        head.copy_from_slice(&self.data[self.read_pos..self.read_pos + first]);
        let rest = tail.len();
        tail.copy_from_slice(&self.data[..rest]);

        self.read_pos = (self.read_pos + size) % cap;
        self.len -= size;

        let position = self.dequeued;
        self.dequeued += 1;
        position
    }
}
