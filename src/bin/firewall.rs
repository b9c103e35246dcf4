// firewall <input_file> <output_file> <num_consumers>
//
// Reads fixed-size packet records from the input file, classifies them on a
// pool of consumer threads and writes one report line per packet to the
// output file, in input order.

use dmxp_firewall::MPMC::Structs::DEFAULT_RECORD_SIZE;
use dmxp_firewall::MPMC::{create_consumers, ChannelBuilder};
use std::env;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Fill `buf` completely. `Ok(false)` on a clean end of input, an error on a
/// trailing partial record.
fn read_record<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("trailing partial record of {filled} bytes"),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <input_file> <output_file> <num_consumers>", args[0]);
        std::process::exit(1);
    }

    let num_consumers: usize = match args[3].parse() {
        Ok(n) if n > 0 => n,
        _ => {
            eprintln!("Invalid number of consumers: {}", args[3]);
            std::process::exit(1);
        }
    };

    init_logging();

    let input = File::open(&args[1]).map_err(|e| {
        io::Error::new(e.kind(), format!("failed to open input {}: {e}", args[1]))
    })?;
    let mut reader = BufReader::new(input);

    let (producer, channel) = ChannelBuilder::new()
        .with_record_size(DEFAULT_RECORD_SIZE)
        .build()?;
    let pool = create_consumers(num_consumers, &channel, &args[2])?;

    // Stop reading on Ctrl+C; consumers still drain what was sent.
    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::SeqCst);
    })
    .map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("Error setting Ctrl+C handler: {e}"),
        )
    })?;

    tracing::info!(
        input = %args[1],
        output = %args[2],
        consumers = num_consumers,
        "firewall started"
    );

    let start = std::time::Instant::now();
    let mut record = vec![0u8; producer.record_size()];
    let mut read_result = Ok(());

    while running.load(Ordering::SeqCst) {
        match read_record(&mut reader, &mut record) {
            Ok(true) => producer.send(&record)?,
            Ok(false) => break,
            Err(e) => {
                read_result = Err(e);
                break;
            }
        }
    }

    if !running.load(Ordering::SeqCst) {
        tracing::warn!(sent = producer.sent(), "interrupted, draining records already sent");
    }

    let sent = producer.sent();
    producer.finish();
    let stats = pool.join()?;

    tracing::info!(
        sent,
        processed = stats.processed,
        passed = stats.passed,
        dropped = stats.dropped,
        elapsed = ?start.elapsed(),
        "firewall finished"
    );

    read_result
}
