use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Write};

/// Append-only destination for report lines.
///
/// Consumers only call `emit` while holding their turn, so an implementation
/// sees one call at a time, in order. Each call must append the whole line.
pub trait RecordSink: Send + Sync {
    fn emit(&self, line: &[u8]) -> io::Result<()>;
}

impl RecordSink for File {
    fn emit(&self, line: &[u8]) -> io::Result<()> {
        let mut file: &File = self;
        file.write_all(line)
    }
}

/// In-memory sink, mostly for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    bytes: Mutex<Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything emitted so far.
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.bytes.lock())
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, line: &[u8]) -> io::Result<()> {
        self.bytes.lock().extend_from_slice(line);
        Ok(())
    }
}
