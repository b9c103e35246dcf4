use std::fmt;
use crate::MPMC::Buffer::RingBuffer;
use crate::MPMC::OrderedChannel;

/// Debug function for RingBuffer
///
/// Shows the cursors under the lock without dumping the stored bytes.
pub fn debug_ring_buffer(buffer: &RingBuffer, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = buffer.state.lock();
    f.debug_struct("RingBuffer")
        .field("capacity", &buffer.capacity)
        .field("len", &state.len)
        .field("read_pos", &state.read_pos)
        .field("write_pos", &state.write_pos)
        .field("connected", &state.connected)
        .field("enqueued", &state.enqueued)
        .field("dequeued", &state.dequeued)
        .finish_non_exhaustive()
}

/// Debug function for OrderedChannel
///
/// Shows:
/// - Record size
/// - Underlying RingBuffer and OrderQueue state
/// - Opaque reference to the processor
pub fn debug_ordered_channel(channel: &OrderedChannel, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OrderedChannel")
        .field("record_size", &channel.record_size())
        .field("buffer", channel.buffer())
        .field("tickets", channel.tickets())
        .field("processor", &"<opaque>")
        .finish()
}
