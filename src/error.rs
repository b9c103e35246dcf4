//! Error types for the ordered channel.

use std::io;

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Channel errors.
///
/// A drained, disconnected buffer is not an error: `dequeue` reports it as
/// [`Dequeued::Closed`](crate::MPMC::Buffer::Dequeued::Closed).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The request can never fit in the buffer.
    #[error("record of {size} bytes exceeds buffer capacity of {capacity} bytes")]
    OversizedRecord { size: usize, capacity: usize },

    /// The producer handed over a record of the wrong length.
    #[error("record size mismatch: expected {expected} bytes, got {actual}")]
    RecordSize { expected: usize, actual: usize },

    /// Zero-sized buffer or record, or a record larger than the buffer.
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),

    /// Backing storage could not be reserved.
    #[error("failed to allocate {capacity} bytes of buffer storage")]
    AllocationFailed { capacity: usize },

    /// Enqueue after the producer side was shut down.
    #[error("channel is disconnected")]
    Disconnected,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<ChannelError> for io::Error {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Io(e) => e,
            ChannelError::Disconnected => {
                io::Error::new(io::ErrorKind::BrokenPipe, err.to_string())
            }
            other => io::Error::new(io::ErrorKind::InvalidInput, other.to_string()),
        }
    }
}
