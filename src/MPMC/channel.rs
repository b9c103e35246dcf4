use crate::error::{ChannelError, Result};
use crate::Core::processor::RecordProcessor;
use crate::Core::Sequencer::{OrderQueue, Ticket};
use crate::MPMC::Buffer::{Dequeued, RingBuffer};
use crossbeam_utils::CachePadded;
use std::sync::Arc;

/// A ring buffer and its order ticket queue, wired together.
///
/// Lock order is always buffer, then tickets: registration happens inside
/// the buffer's enqueue critical section, consumers only ever take the
/// ticket lock on its own.
pub struct OrderedChannel {
    buffer: CachePadded<RingBuffer>,
    tickets: CachePadded<OrderQueue>,
    record_size: usize,
    processor: Arc<dyn RecordProcessor>,
}

impl OrderedChannel {
    pub fn new(
        buffer_size: usize,
        record_size: usize,
        processor: Arc<dyn RecordProcessor>,
    ) -> Result<Self> {
        if record_size == 0 {
            return Err(ChannelError::InvalidCapacity(
                "record size must be non-zero".to_string(),
            ));
        }
        if record_size > buffer_size {
            return Err(ChannelError::InvalidCapacity(format!(
                "record size {record_size} exceeds buffer size {buffer_size}"
            )));
        }

        let buffer = RingBuffer::new(buffer_size)?;
        tracing::debug!(buffer_size, record_size, "ordered channel created");

        Ok(Self {
            buffer: CachePadded::new(buffer),
            tickets: CachePadded::new(OrderQueue::new()),
            record_size,
            processor,
        })
    }

    pub(crate) fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    /// Bytes enqueued but not yet received.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Size of the ring buffer in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn tickets(&self) -> &OrderQueue {
        &self.tickets
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn processor(&self) -> &dyn RecordProcessor {
        &*self.processor
    }

    /// Enqueue `record`, blocking while the buffer is full, and register its
    /// key atomically with the byte copy.
    pub fn send(&self, record: &[u8]) -> Result<Ticket> {
        if record.len() != self.record_size {
            return Err(ChannelError::RecordSize {
                expected: self.record_size,
                actual: record.len(),
            });
        }

        let key = self.processor.sequence_key(record);
        let tickets = &self.tickets;
        let position = self.buffer.enqueue_with(record, |position| {
            let registered = tickets.register(key);
            debug_assert_eq!(registered, position, "ticket log out of step with buffer");
        })?;

        Ok(Ticket { position, key })
    }

    /// Dequeue the next record into `out`.
    ///
    /// `Ok(None)` once the producer has finished and the buffer is drained.
    pub fn receive(&self, out: &mut [u8]) -> Result<Option<Ticket>> {
        if out.len() != self.record_size {
            return Err(ChannelError::RecordSize {
                expected: self.record_size,
                actual: out.len(),
            });
        }

        match self.buffer.dequeue(out)? {
            Dequeued::Record { position } => Ok(Some(Ticket {
                position,
                key: self.processor.sequence_key(out),
            })),
            Dequeued::Closed => Ok(None),
        }
    }

    /// Producer is done: wake drained consumers and seal the ticket log.
    /// Idempotent.
    pub fn shutdown(&self) {
        self.buffer.disconnect();
        self.tickets.seal();
    }

    pub fn is_shut_down(&self) -> bool {
        !self.buffer.is_connected()
    }
}

impl std::fmt::Debug for OrderedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_ordered_channel(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Core::processor::PacketFilter;

    fn channel(buffer: usize, record: usize) -> Result<OrderedChannel> {
        OrderedChannel::new(buffer, record, Arc::new(PacketFilter::default()))
    }

    #[test]
    fn rejects_bad_sizes() {
        assert!(matches!(channel(64, 0), Err(ChannelError::InvalidCapacity(_))));
        assert!(matches!(channel(8, 16), Err(ChannelError::InvalidCapacity(_))));
        assert!(matches!(channel(0, 0), Err(ChannelError::InvalidCapacity(_))));
    }

    #[test]
    fn send_checks_record_size() {
        let ch = channel(64, 16).unwrap();
        assert!(matches!(
            ch.send(&[0u8; 15]),
            Err(ChannelError::RecordSize { expected: 16, actual: 15 })
        ));
    }

    #[test]
    fn tickets_match_buffer_positions() {
        let ch = channel(64, 16).unwrap();
        let mut rec = [0u8; 16];
        rec[0] = 9;
        assert_eq!(ch.send(&rec).unwrap(), Ticket { position: 0, key: 9 });
        rec[0] = 11;
        assert_eq!(ch.send(&rec).unwrap(), Ticket { position: 1, key: 11 });
        assert_eq!(ch.tickets().registered(), 2);

        ch.shutdown();
        let mut out = [0u8; 16];
        assert_eq!(ch.receive(&mut out).unwrap(), Some(Ticket { position: 0, key: 9 }));
        assert_eq!(ch.receive(&mut out).unwrap(), Some(Ticket { position: 1, key: 11 }));
        assert_eq!(ch.receive(&mut out).unwrap(), None);
        assert!(ch.is_shut_down());
    }

    #[test]
    fn shutdown_during_blocked_send_leaves_no_orphan_record() {
        let ch = Arc::new(channel(16, 16).unwrap());
        let mut rec = [0u8; 16];
        rec[0] = 1;
        ch.send(&rec).unwrap();

        let sender = {
            let ch = ch.clone();
            std::thread::spawn(move || {
                let mut rec = [0u8; 16];
                rec[0] = 2;
                ch.send(&rec)
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        ch.shutdown();

        let mut out = [0u8; 16];
        let ticket = ch.receive(&mut out).unwrap().unwrap();
        ch.tickets().await_turn(ticket).advance();

        assert!(matches!(sender.join().unwrap(), Err(ChannelError::Disconnected)));
        assert_eq!(ch.buffered(), 0);
        assert_eq!(ch.tickets().registered(), 1);
        assert_eq!(ch.receive(&mut out).unwrap(), None);
    }
}
