//! Bounded, ordered record channel.
//!
//! One producer hands fixed-size records to a pool of consumer threads
//! through a blocking byte ring buffer. Consumers process records in
//! parallel but emit their output in the order the records were produced,
//! by taking turns on an order ticket queue keyed by each record's
//! sequence key.
//!
//! ```no_run
//! use dmxp_firewall::MPMC::{create_consumers, ChannelBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (producer, channel) = ChannelBuilder::new().with_record_size(64).build()?;
//! let pool = create_consumers(4, &channel, "out.log")?;
//!
//! producer.send([0u8; 64])?;
//! producer.finish();
//!
//! let stats = pool.join()?;
//! assert_eq!(stats.processed, 1);
//! # Ok(())
//! # }
//! ```

// Channel types: ring buffer, producer, consumer pool, sinks.
#[allow(non_snake_case)]
pub mod MPMC;

#[allow(non_snake_case)]
pub mod Core;

#[allow(non_snake_case)]
mod Debug {
    pub mod StructDebug;
}

pub mod error;

pub use error::{ChannelError, Result};
