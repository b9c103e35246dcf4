// Record-level types: the packet header carried at the front of every record,
// the classification verdict and the report line written to the sink.

use std::fmt;
use std::net::Ipv4Addr;

/// Size of the fixed header at the start of each record.
pub const HEADER_SIZE: usize = 16;

/// Default size of one record in bytes.
pub const DEFAULT_RECORD_SIZE: usize = 256;

/// Header at the start of each packet record.
///
/// Layout: `timestamp` little-endian at 0..8, then the source and destination
/// IPv4 addresses in network order at 8..12 and 12..16.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    pub timestamp: u64,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl PacketHeader {
    /// Read the header from the front of `record`. `None` if the record is
    /// shorter than [`HEADER_SIZE`].
    pub fn parse(record: &[u8]) -> Option<Self> {
        let header: &[u8; HEADER_SIZE] = record.get(..HEADER_SIZE)?.try_into().ok()?;

        let mut ts = [0u8; 8];
        ts.copy_from_slice(&header[0..8]);
        let mut src = [0u8; 4];
        src.copy_from_slice(&header[8..12]);
        let mut dst = [0u8; 4];
        dst.copy_from_slice(&header[12..16]);

        Some(Self {
            timestamp: u64::from_le_bytes(ts),
            source: Ipv4Addr::from(src),
            destination: Ipv4Addr::from(dst),
        })
    }

    /// Write the header into the front of `record`.
    ///
    /// # Panics
    /// Panics if `record` is shorter than [`HEADER_SIZE`].
    pub fn write_to(&self, record: &mut [u8]) {
        assert!(
            record.len() >= HEADER_SIZE,
            "record of {} bytes cannot hold a {} byte header",
            record.len(),
            HEADER_SIZE
        );
        record[0..8].copy_from_slice(&self.timestamp.to_le_bytes());
        record[8..12].copy_from_slice(&self.source.octets());
        record[12..16].copy_from_slice(&self.destination.octets());
    }
}

/// Classification result for one record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Pass,
    Drop,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Drop => "DROP",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output line: `"<VERDICT> <16 hex digit fingerprint> <sequence key>\n"`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub verdict: Verdict,
    pub fingerprint: u64,
    pub sequence_key: u64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {:016x} {}",
            self.verdict, self.fingerprint, self.sequence_key
        )
    }
}
