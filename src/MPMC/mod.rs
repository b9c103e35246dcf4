mod builder;
mod channel;
mod consumer;
mod producer;
mod sink;

pub use builder::{ChannelBuilder, DEFAULT_BUFFER_RECORDS};
pub use channel::OrderedChannel;
pub use consumer::{create_consumers, Consumer, ConsumerPool, ConsumerStats, PoolStats};
pub use producer::Producer;
pub use sink::{MemorySink, RecordSink};

pub mod Buffer {
    pub mod Buffer;
    pub mod Buffer_impl;
    pub mod layout;
    pub use Buffer::{Dequeued, RingBuffer}; // re-export for stable path
}

pub mod Structs {
    pub mod Buffer_Structs;
    // re-export for stable path
    pub use Buffer_Structs::{PacketHeader, Report, Verdict, DEFAULT_RECORD_SIZE, HEADER_SIZE};
}
