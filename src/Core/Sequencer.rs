//! Turn-taking over the order records were produced in.
//!
//! Every record enqueued into the ring buffer registers its sequence key
//! here, in the same critical section as the byte copy. A consumer that has
//! finished processing a record waits until the record's position reaches
//! `head`, performs its one externally visible write while holding the
//! [`Turn`], then advances `head` so the next record's consumer may proceed.
//!
//! Positions rather than raw keys decide whose turn it is, so records that
//! share a key are still emitted in enqueue order. The carried key is checked
//! against the logged key when the turn is granted.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// Identifies one registered record: where it sits in the log and the
/// sequence key it carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub position: u64,
    pub key: u64,
}

struct TicketLog {
    /// Keys from `head` onwards. Served keys are popped from the front.
    pending: VecDeque<u64>,
    /// Absolute position of the next record allowed to emit.
    head: u64,
    /// Total number of `register` calls.
    registered: u64,
    /// Last key registered, for the monotonicity warning.
    last_key: Option<u64>,
    /// No more keys will be registered.
    sealed: bool,
}

/// Growable FIFO of sequence keys with a monotonic `head` cursor.
pub struct OrderQueue {
    log: Mutex<TicketLog>,
    turn_changed: Condvar,
}

impl Default for OrderQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderQueue {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(TicketLog {
                pending: VecDeque::new(),
                head: 0,
                registered: 0,
                last_key: None,
                sealed: false,
            }),
            turn_changed: Condvar::new(),
        }
    }

    /// Append `key` and return its position. Never blocks.
    ///
    /// # Panics
    /// Panics if the queue has been sealed.
    pub fn register(&self, key: u64) -> u64 {
        let mut log = self.log.lock();
        assert!(!log.sealed, "sequence key {key} registered after seal");

        if let Some(last) = log.last_key {
            if key < last {
                tracing::warn!(key, last, "sequence key went backwards; keeping enqueue order");
            }
        }

        let position = log.registered;
        log.pending.push_back(key);
        log.registered += 1;
        log.last_key = Some(key);
        position
    }

    /// Block until `ticket` is at the head of the log.
    ///
    /// The returned [`Turn`] grants exclusive right to emit output; dropping
    /// it (or calling [`Turn::advance`]) passes the turn on.
    ///
    /// # Panics
    /// On a broken register/advance bijection: the ticket was already
    /// served, it can never be registered because the queue is sealed, or
    /// the key at its position differs from the key it carries.
    pub fn await_turn(&self, ticket: Ticket) -> Turn<'_> {
        let mut log = self.log.lock();
        loop {
            if log.head == ticket.position {
                break;
            }
            assert!(
                ticket.position > log.head,
                "ticket {} awaited after head moved to {}",
                ticket.position,
                log.head
            );
            assert!(
                !(log.sealed && ticket.position >= log.registered),
                "ticket {} was never registered ({} keys in sealed log)",
                ticket.position,
                log.registered
            );
            self.turn_changed.wait(&mut log);
        }

        match log.pending.front() {
            Some(&key) if key == ticket.key => {}
            Some(&key) => panic!(
                "ticket {} carries key {} but the log holds {}",
                ticket.position, ticket.key, key
            ),
            None => panic!("ticket {} is at head but no key is pending", ticket.position),
        }

        Turn {
            queue: self,
            ticket,
            advanced: false,
        }
    }

    /// Move `head` past the current key and wake every waiter.
    pub(crate) fn advance_turn(&self) {
        let mut log = self.log.lock();
        let served = log.pending.pop_front();
        assert!(served.is_some(), "advance_turn with no pending key");
        log.head += 1;
        drop(log);

        self.turn_changed.notify_all();
    }

    /// Give up the turn at `position` without emitting.
    ///
    /// Waits like [`await_turn`](Self::await_turn) and then advances past the
    /// position, but never panics: it returns early when the position was
    /// already served or can no longer be registered. Used by a worker that
    /// unwinds between dequeuing a record and taking its turn.
    pub fn forfeit(&self, position: u64) {
        let mut log = self.log.lock();
        loop {
            if log.head > position || (log.sealed && position >= log.registered) {
                return;
            }
            if log.head == position {
                break;
            }
            self.turn_changed.wait(&mut log);
        }

        log.pending.pop_front();
        log.head += 1;
        drop(log);

        tracing::warn!(position, "turn forfeited");
        self.turn_changed.notify_all();
    }

    /// Declare that no further keys will be registered.
    ///
    /// Waiters for positions that can no longer be registered wake up and
    /// fail loudly instead of hanging.
    pub fn seal(&self) {
        let mut log = self.log.lock();
        if log.sealed {
            return;
        }
        log.sealed = true;
        drop(log);

        self.turn_changed.notify_all();
    }

    /// Position of the next record allowed to emit.
    pub fn head(&self) -> u64 {
        self.log.lock().head
    }

    pub fn registered(&self) -> u64 {
        self.log.lock().registered
    }

    /// Keys registered but not yet served.
    pub fn pending(&self) -> usize {
        self.log.lock().pending.len()
    }

    pub fn is_sealed(&self) -> bool {
        self.log.lock().sealed
    }
}

impl std::fmt::Debug for OrderQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let log = self.log.lock();
        f.debug_struct("OrderQueue")
            .field("head", &log.head)
            .field("registered", &log.registered)
            .field("pending", &log.pending.len())
            .field("sealed", &log.sealed)
            .finish()
    }
}

/// Exclusive right to perform the next ordered write.
///
/// Advances the queue when dropped, so the turn is passed on even if the
/// holder's write fails or its thread unwinds.
#[must_use = "the turn is released as soon as it is dropped"]
pub struct Turn<'a> {
    queue: &'a OrderQueue,
    ticket: Ticket,
    advanced: bool,
}

impl Turn<'_> {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Release the turn to the next record.
    pub fn advance(mut self) {
        self.advanced = true;
        self.queue.advance_turn();
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        if !self.advanced {
            self.queue.advance_turn();
        }
    }
}
