// src/MPMC/consumer.rs

use super::channel::OrderedChannel;
use super::sink::RecordSink;
use crate::Core::Sequencer::{OrderQueue, Ticket, Turn};
use crate::MPMC::Structs::Buffer_Structs::Verdict;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Counters kept by one consumer thread.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub processed: u64,
    pub passed: u64,
    pub dropped: u64,
}

impl ConsumerStats {
    fn record(&mut self, verdict: Verdict) {
        self.processed += 1;
        match verdict {
            Verdict::Pass => self.passed += 1,
            Verdict::Drop => self.dropped += 1,
        }
    }
}

/// Totals for a joined pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub processed: u64,
    pub passed: u64,
    pub dropped: u64,
    /// Records handled by each consumer, in spawn order.
    pub per_consumer: Vec<u64>,
}

/// One worker of the pool.
///
/// Runs the loop: dequeue a record, compute its report without holding any
/// lock, wait for the record's turn, write exactly one line, pass the turn.
pub struct Consumer {
    id: usize,
    channel: Arc<OrderedChannel>,
    sink: Arc<dyn RecordSink>,
}

impl Consumer {
    pub fn new(id: usize, channel: Arc<OrderedChannel>, sink: Arc<dyn RecordSink>) -> Self {
        Self { id, channel, sink }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Consume until the channel is shut down and drained.
    ///
    /// A failed sink write does not stop the loop: the turn is still passed
    /// on so the pipeline keeps draining, and the first error is returned
    /// once the channel closes.
    pub fn run(&self) -> io::Result<ConsumerStats> {
        let mut record = vec![0u8; self.channel.record_size()];
        let mut line = String::with_capacity(64);
        let mut stats = ConsumerStats::default();
        let mut first_error: Option<io::Error> = None;

        tracing::debug!(consumer = self.id, "consumer started");

        while let Some(ticket) = self.channel.receive(&mut record)? {
            let claim = Claim::new(self.channel.tickets(), ticket);
            let report = self.channel.processor().report(&record);
            stats.record(report.verdict);

            line.clear();
            let _ = write!(line, "{report}");

            let turn = claim.take();
            let written = self.sink.emit(line.as_bytes());
            turn.advance();

            if let Err(e) = written {
                tracing::error!(
                    consumer = self.id,
                    position = ticket.position,
                    error = %e,
                    "sink write failed"
                );
                first_error.get_or_insert(e);
            }
        }

        tracing::debug!(consumer = self.id, processed = stats.processed, "consumer stopped");

        match first_error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }
}

/// A dequeued record whose turn has not been taken yet.
///
/// If the worker unwinds before [`Claim::take`], the turn is forfeited on
/// drop so later records are not left waiting on it.
struct Claim<'a> {
    tickets: &'a OrderQueue,
    ticket: Ticket,
    armed: bool,
}

impl<'a> Claim<'a> {
    fn new(tickets: &'a OrderQueue, ticket: Ticket) -> Self {
        Self {
            tickets,
            ticket,
            armed: true,
        }
    }

    fn take(mut self) -> Turn<'a> {
        self.armed = false;
        self.tickets.await_turn(self.ticket)
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::error!(position = self.ticket.position, "worker unwound before its turn");
            self.tickets.forfeit(self.ticket.position);
        }
    }
}

/// Handles of a running consumer pool.
#[derive(Debug)]
pub struct ConsumerPool {
    handles: Vec<JoinHandle<io::Result<ConsumerStats>>>,
}

impl ConsumerPool {
    /// Start `thread_count` consumers sharing `channel` and `sink`.
    pub fn spawn(
        thread_count: usize,
        channel: &Arc<OrderedChannel>,
        sink: Arc<dyn RecordSink>,
    ) -> io::Result<Self> {
        if thread_count == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "consumer pool needs at least one thread",
            ));
        }

        let mut handles = Vec::with_capacity(thread_count);
        for id in 0..thread_count {
            let consumer = Consumer::new(id, channel.clone(), sink.clone());
            let handle = thread::Builder::new()
                .name(format!("consumer-{id}"))
                .spawn(move || consumer.run())?;
            handles.push(handle);
        }

        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The raw join handles.
    pub fn into_handles(self) -> Vec<JoinHandle<io::Result<ConsumerStats>>> {
        self.handles
    }

    /// Wait for every consumer. Returns the first error any consumer hit,
    /// after all of them have been joined.
    pub fn join(self) -> io::Result<PoolStats> {
        let mut totals = PoolStats::default();
        let mut first_error: Option<io::Error> = None;

        for handle in self.handles {
            let result = handle.join().unwrap_or_else(|_| {
                Err(io::Error::new(io::ErrorKind::Other, "consumer thread panicked"))
            });
            match result {
                Ok(stats) => {
                    totals.processed += stats.processed;
                    totals.passed += stats.passed;
                    totals.dropped += stats.dropped;
                    totals.per_consumer.push(stats.processed);
                }
                Err(e) => {
                    totals.per_consumer.push(0);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(totals),
        }
    }
}

/// Open `sink_path` for appending (created if missing) and start
/// `thread_count` consumers writing to it.
///
/// The file is opened once here and closed when the last consumer is done
/// with it.
pub fn create_consumers<P: AsRef<Path>>(
    thread_count: usize,
    channel: &Arc<OrderedChannel>,
    sink_path: P,
) -> io::Result<ConsumerPool> {
    let sink_path = sink_path.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(sink_path)
        .map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("failed to open sink {}: {e}", sink_path.display()),
            )
        })?;

    tracing::debug!(thread_count, sink = %sink_path.display(), "starting consumers");
    ConsumerPool::spawn(thread_count, channel, Arc::new(file))
}
