use dmxp_firewall::Core::{PacketFilter, RecordProcessor};
use dmxp_firewall::MPMC::Structs::PacketHeader;
use dmxp_firewall::MPMC::{create_consumers, ChannelBuilder, ConsumerPool, MemorySink, RecordSink};
use std::io;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn packet16(timestamp: u64, source: Ipv4Addr) -> [u8; 16] {
    let mut record = [0u8; 16];
    PacketHeader {
        timestamp,
        source,
        destination: Ipv4Addr::new(10, 0, 0, 254),
    }
    .write_to(&mut record);
    record
}

#[test]
fn four_records_three_consumers_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.log");

    let (producer, channel) = ChannelBuilder::new()
        .with_buffer_size(64)
        .with_record_size(16)
        .build()
        .unwrap();
    let pool = create_consumers(3, &channel, &out_path).unwrap();
    assert_eq!(pool.len(), 3);

    let records = [
        packet16(1, Ipv4Addr::new(10, 1, 1, 1)),
        packet16(2, Ipv4Addr::new(8, 8, 8, 8)),
        packet16(3, Ipv4Addr::new(192, 168, 7, 7)),
        packet16(4, Ipv4Addr::new(1, 1, 1, 1)),
    ];
    for r in &records {
        producer.send(r).unwrap();
    }
    producer.finish();

    let stats = pool.join().unwrap();
    assert_eq!(stats.processed, 4);
    assert_eq!(stats.passed, 2);
    assert_eq!(stats.dropped, 2);

    let filter = PacketFilter::default();
    let expected: String = records.iter().map(|r| filter.report(r).to_string()).collect();
    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written, expected);

    let verdicts: Vec<&str> = written.lines().map(|l| l.split(' ').next().unwrap()).collect();
    assert_eq!(verdicts, ["PASS", "DROP", "PASS", "DROP"]);
    let keys: Vec<&str> = written.lines().map(|l| l.rsplit(' ').next().unwrap()).collect();
    assert_eq!(keys, ["1", "2", "3", "4"]);
    for line in written.lines() {
        assert_eq!(line.split(' ').nth(1).unwrap().len(), 16);
    }
}

#[test]
fn sink_file_is_appended_to() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.log");
    std::fs::write(&out_path, "existing\n").unwrap();

    let (producer, channel) = ChannelBuilder::new()
        .with_buffer_size(64)
        .with_record_size(16)
        .build()
        .unwrap();
    let pool = create_consumers(2, &channel, &out_path).unwrap();
    producer.send(packet16(7, Ipv4Addr::new(10, 0, 0, 1))).unwrap();
    producer.finish();
    pool.join().unwrap();

    let written = std::fs::read_to_string(&out_path).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "existing");
    assert!(lines[1].starts_with("PASS ") && lines[1].ends_with(" 7"));
}

#[test]
fn missing_sink_directory_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (_producer, channel) = ChannelBuilder::new().with_record_size(16).build().unwrap();
    let err = create_consumers(2, &channel, dir.path().join("no/such/dir/out.log")).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[test]
fn zero_consumers_is_rejected() {
    let (_producer, channel) = ChannelBuilder::new().with_record_size(16).build().unwrap();
    let err = ConsumerPool::spawn(0, &channel, Arc::new(MemorySink::new())).err().unwrap();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
}

#[test]
fn buffered_records_drain_after_producer_finishes() {
    let (producer, channel) = ChannelBuilder::new()
        .with_buffer_size(16 * 8)
        .with_record_size(16)
        .build()
        .unwrap();

    // Everything is buffered and the producer is gone before any consumer starts.
    for ts in 1..=8 {
        producer.send(packet16(ts, Ipv4Addr::new(10, 0, 0, ts as u8))).unwrap();
    }
    producer.finish();
    assert_eq!(channel.buffered(), 16 * 8);

    let sink = Arc::new(MemorySink::new());
    let stats = ConsumerPool::spawn(4, &channel, sink.clone()).unwrap().join().unwrap();
    assert_eq!(stats.processed, 8);

    let keys: Vec<String> = sink
        .lines()
        .iter()
        .map(|l| l.rsplit(' ').next().unwrap().to_string())
        .collect();
    let expected: Vec<String> = (1..=8).map(|k: u64| k.to_string()).collect();
    assert_eq!(keys, expected);
    assert_eq!(channel.buffered(), 0);
}

/// Fails every other write.
struct FlakySink {
    inner: MemorySink,
    calls: AtomicUsize,
}

impl RecordSink for FlakySink {
    fn emit(&self, line: &[u8]) -> io::Result<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.inner.emit(line)
    }
}

#[test]
fn sink_errors_do_not_stall_the_pipeline() {
    let (producer, channel) = ChannelBuilder::new()
        .with_buffer_size(32)
        .with_record_size(16)
        .build()
        .unwrap();
    let sink = Arc::new(FlakySink {
        inner: MemorySink::new(),
        calls: AtomicUsize::new(0),
    });
    let pool = ConsumerPool::spawn(2, &channel, sink.clone()).unwrap();

    // More records than the buffer holds: the producer only finishes if
    // consumers keep going after failed writes.
    for ts in 1..=20 {
        producer.send(packet16(ts, Ipv4Addr::new(10, 0, 0, 1))).unwrap();
    }
    producer.finish();

    let err = pool.join().unwrap_err();
    assert_eq!(err.to_string(), "disk full");
    assert_eq!(sink.calls.load(Ordering::SeqCst), 20);

    // Successful writes are the odd keys, still in order.
    let keys: Vec<u64> = sink
        .inner
        .lines()
        .iter()
        .map(|l| l.rsplit(' ').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(keys, (1..=20).step_by(2).collect::<Vec<u64>>());
}

/// Panics while classifying the record with key 5.
struct PanicOnFive(PacketFilter);

impl RecordProcessor for PanicOnFive {
    fn sequence_key(&self, record: &[u8]) -> u64 {
        self.0.sequence_key(record)
    }

    fn classify(&self, record: &[u8]) -> dmxp_firewall::MPMC::Structs::Verdict {
        assert_ne!(self.0.sequence_key(record), 5, "classifier blew up");
        self.0.classify(record)
    }

    fn fingerprint(&self, record: &[u8]) -> u64 {
        self.0.fingerprint(record)
    }
}

#[test]
fn panicking_classifier_does_not_strand_later_records() {
    let (producer, channel) = ChannelBuilder::new()
        .with_buffer_size(32)
        .with_record_size(16)
        .with_processor(Arc::new(PanicOnFive(PacketFilter::default())))
        .build()
        .unwrap();
    let sink = Arc::new(MemorySink::new());
    let pool = ConsumerPool::spawn(3, &channel, sink.clone()).unwrap();

    for ts in 1..=12 {
        producer.send(packet16(ts, Ipv4Addr::new(10, 0, 0, 1))).unwrap();
    }
    producer.finish();

    let err = pool.join().unwrap_err();
    assert_eq!(err.to_string(), "consumer thread panicked");

    let keys: Vec<u64> = sink
        .lines()
        .iter()
        .map(|l| l.rsplit(' ').next().unwrap().parse().unwrap())
        .collect();
    let expected: Vec<u64> = (1..=12).filter(|&k| k != 5).collect();
    assert_eq!(keys, expected);
    assert_eq!(channel.tickets().head(), 12);
}

#[test]
fn stress_has_no_lock_cycles() {
    let (producer, channel) = ChannelBuilder::new()
        .with_buffer_size(16 * 4)
        .with_record_size(16)
        .build()
        .unwrap();
    let sink = Arc::new(MemorySink::new());
    let pool = ConsumerPool::spawn(6, &channel, sink.clone()).unwrap();

    let feeder = thread::spawn(move || {
        for ts in 0..5_000u64 {
            producer.send(packet16(ts, Ipv4Addr::new(172, 16, 0, 1))).unwrap();
        }
        producer.finish();
    });

    thread::sleep(Duration::from_millis(20));
    assert!(parking_lot::deadlock::check_deadlock().is_empty());

    feeder.join().unwrap();
    let stats = pool.join().unwrap();
    assert_eq!(stats.processed, 5_000);
    assert!(parking_lot::deadlock::check_deadlock().is_empty());

    let lines = sink.lines();
    assert_eq!(lines.len(), 5_000);
    for (ts, line) in lines.iter().enumerate() {
        assert!(line.ends_with(&format!(" {ts}")), "line {ts} is {line}");
    }
}
