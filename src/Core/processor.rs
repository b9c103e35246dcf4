use crate::MPMC::Structs::Buffer_Structs::{PacketHeader, Report, Verdict};
use sha2::{Digest, Sha256};
use std::net::Ipv4Addr;

/// Per-record work done by consumers outside any lock.
///
/// Implementations must be pure: no blocking and no shared mutable state.
pub trait RecordProcessor: Send + Sync {
    /// Ordering key carried by the record.
    fn sequence_key(&self, record: &[u8]) -> u64;

    fn classify(&self, record: &[u8]) -> Verdict;

    fn fingerprint(&self, record: &[u8]) -> u64;

    /// Everything a consumer writes for `record`.
    fn report(&self, record: &[u8]) -> Report {
        Report {
            verdict: self.classify(record),
            fingerprint: self.fingerprint(record),
            sequence_key: self.sequence_key(record),
        }
    }
}

/// Inclusive range of IPv4 source addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SourceRange {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

impl SourceRange {
    pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> Self {
        Self { start, end }
    }

    /// Range covering `network/prefix_len`.
    pub fn cidr(network: Ipv4Addr, prefix_len: u8) -> Self {
        let prefix_len = prefix_len.min(32);
        let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
        let base = u32::from(network) & mask;
        Self {
            start: Ipv4Addr::from(base),
            end: Ipv4Addr::from(base | !mask),
        }
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        (self.start..=self.end).contains(&addr)
    }
}

/// Source ranges whose packets are let through.
#[derive(Clone, Debug)]
pub struct FilterConfig {
    ranges: Vec<SourceRange>,
}

impl Default for FilterConfig {
    /// The RFC 1918 private networks.
    fn default() -> Self {
        Self::empty()
            .with_range(SourceRange::cidr(Ipv4Addr::new(10, 0, 0, 0), 8))
            .with_range(SourceRange::cidr(Ipv4Addr::new(172, 16, 0, 0), 12))
            .with_range(SourceRange::cidr(Ipv4Addr::new(192, 168, 0, 0), 16))
    }
}

impl FilterConfig {
    /// Drops everything until ranges are added.
    pub fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.ranges.push(range);
        self
    }

    pub fn ranges(&self) -> &[SourceRange] {
        &self.ranges
    }
}

/// Default processor: packets keyed by their header timestamp, passed when
/// the source address is inside a configured range, fingerprinted with
/// SHA-256.
#[derive(Clone, Debug, Default)]
pub struct PacketFilter {
    config: FilterConfig,
}

impl PacketFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }
}

impl RecordProcessor for PacketFilter {
    fn sequence_key(&self, record: &[u8]) -> u64 {
        PacketHeader::parse(record).map_or(0, |h| h.timestamp)
    }

    fn classify(&self, record: &[u8]) -> Verdict {
        match PacketHeader::parse(record) {
            Some(h) if self.config.ranges.iter().any(|r| r.contains(h.source)) => Verdict::Pass,
            _ => Verdict::Drop,
        }
    }

    /// First eight bytes of the record's SHA-256 digest, big-endian.
    fn fingerprint(&self, record: &[u8]) -> u64 {
        let digest = Sha256::digest(record);
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }
}
