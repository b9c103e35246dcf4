pub mod Sequencer;
pub mod processor;

pub use Sequencer::{OrderQueue, Ticket, Turn};
pub use processor::{FilterConfig, PacketFilter, RecordProcessor, SourceRange};
