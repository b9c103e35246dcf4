// This is the bounded byte ring shared by the producer and every consumer

use super::layout::RingState;
use parking_lot::{Condvar, Mutex};

/// A bounded, blocking, byte-addressed circular buffer.
///
/// ### Concurrency Design:
/// - **One lock**: all cursor and byte mutation happens under `state`.
/// - **Producers (Enqueue)**: wait on `writable` while the free space is
///   smaller than the record, then copy in and notify `readable`.
/// - **Consumers (Dequeue)**: wait on `readable` while fewer bytes than
///   requested are stored and the buffer is still connected, then copy out
///   and notify `writable`.
/// - **Disconnect**: clears `connected` and notifies `readable` only, so
///   consumers parked on an empty buffer observe [`Dequeued::Closed`].
///
/// Every wait re-checks its condition in a loop; spurious wakes and wakes
/// meant for other waiters are harmless.
pub struct RingBuffer {
    /// Cursors and storage.
    pub(crate) state: Mutex<RingState>,

    /// Signalled after bytes are added or the buffer is disconnected.
    pub(crate) readable: Condvar,

    /// Signalled after bytes are removed.
    pub(crate) writable: Condvar,

    /// Fixed at construction; duplicated outside the lock so size checks
    /// never contend.
    pub(crate) capacity: usize,
}

/// Outcome of a successful `dequeue` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dequeued {
    /// A whole record was copied out. `position` numbers dequeue calls in
    /// order, starting at zero; it equals the position the matching enqueue
    /// returned.
    Record { position: u64 },

    /// The producer disconnected and not enough bytes remain. No more work.
    Closed,
}
