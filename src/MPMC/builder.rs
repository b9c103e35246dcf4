use super::channel::OrderedChannel;
use super::Producer;
use crate::error::Result;
use crate::Core::processor::{PacketFilter, RecordProcessor};
use crate::MPMC::Structs::Buffer_Structs::DEFAULT_RECORD_SIZE;
use std::sync::Arc;

/// Records the default buffer holds.
pub const DEFAULT_BUFFER_RECORDS: usize = 1024;

pub struct ChannelBuilder {
    buffer_size: Option<usize>,
    record_size: usize,
    processor: Arc<dyn RecordProcessor>,
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self {
            buffer_size: None, // DEFAULT_BUFFER_RECORDS records
            record_size: DEFAULT_RECORD_SIZE,
            processor: Arc::new(PacketFilter::default()),
        }
    }
}

impl ChannelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ring buffer capacity in bytes.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size);
        self
    }

    pub fn with_record_size(mut self, size: usize) -> Self {
        self.record_size = size;
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn RecordProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
            .unwrap_or_else(|| self.record_size.saturating_mul(DEFAULT_BUFFER_RECORDS))
    }

    pub fn build_channel(self) -> Result<Arc<OrderedChannel>> {
        let buffer_size = self.buffer_size();
        Ok(Arc::new(OrderedChannel::new(
            buffer_size,
            self.record_size,
            self.processor,
        )?))
    }

    /// Builds the channel and its producer. Hand the channel to
    /// [`create_consumers`](super::create_consumers).
    pub fn build(self) -> Result<(Producer, Arc<OrderedChannel>)> {
        let channel = self.build_channel()?;
        Ok((Producer::new(channel.clone()), channel))
    }
}
