// In src/MPMC/producer.rs
use super::channel::OrderedChannel;
use crate::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The single writer side of an [`OrderedChannel`].
///
/// Records are sent in production order; the channel registers each one's
/// sequence key so consumers can emit in that same order. Finishing (or
/// dropping) the producer disconnects the channel exactly once.
pub struct Producer {
    channel: Arc<OrderedChannel>,
    sent: AtomicU64,
}

impl Producer {
    pub(crate) fn new(channel: Arc<OrderedChannel>) -> Self {
        Self {
            channel,
            sent: AtomicU64::new(0),
        }
    }

    /// Sends one record, blocking while the buffer is full.
    ///
    /// # Returns
    /// * `Ok(())` once the record is stored and its key registered
    /// * `Err(ChannelError::RecordSize)` if the record is not `record_size` bytes
    /// * `Err(ChannelError::Disconnected)` if the channel was already shut down
    pub fn send<T: AsRef<[u8]>>(&self, record: T) -> Result<()> {
        let ticket = self.channel.send(record.as_ref())?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(position = ticket.position, key = ticket.key, "record sent");
        Ok(())
    }

    /// Signals that no more records will be sent.
    pub fn finish(self) {
        // Drop does the work.
    }

    /// Number of records sent so far
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn channel(&self) -> &Arc<OrderedChannel> {
        &self.channel
    }

    pub fn record_size(&self) -> usize {
        self.channel.record_size()
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        tracing::debug!(sent = self.sent(), "producer finished");
        self.channel.shutdown();
    }
}
