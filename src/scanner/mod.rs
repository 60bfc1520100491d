//! Scanner module - the concurrent sweep engine.
//!
//! [`run_scan`] walks an [`AddressCursor`] for a fixed number of addresses,
//! feeds them through a bounded queue to a [`WorkerPool`], and forwards the
//! report lines the workers produce to a single sink consumer.

pub mod classify;
pub mod cursor;
pub mod pool;
pub mod tcp;
pub mod tls;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::{ScanError, ScanResult};
use crate::sink::{spawn_consumer, ResultSink, SinkStats};
use crate::types::{Address, Direction, Port};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub use classify::{
    classify, is_placeholder_certificate, passes_report_gate, probe, ReportLine, ReportPolicy,
};
pub use cursor::AddressCursor;
pub use pool::{PoolStats, ProbeJob, WaitGroup, WorkerPool};
pub use tls::RustlsTransport;
pub use traits::{Connection, HandshakeResult, TlsSession, TlsVersion, Transport};

/// Configuration for a sweep.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// The cursor starts here; the first scanned address is its neighbour.
    pub start: Address,
    pub direction: Direction,
    /// How many addresses to generate (fewer if the space runs out).
    pub count: usize,
    pub port: Port,
    pub workers: usize,
    /// Limit for the TCP connect and, separately, for the TLS handshake.
    pub timeout: Duration,
    pub show_failures: bool,
    /// Upper bound on queued addresses and buffered report lines.
    pub queue_capacity: usize,
    pub progress: bool,
}

impl ScanConfig {
    pub const DEFAULT_COUNT: usize = 10_000;
    pub const DEFAULT_WORKERS: usize = 128;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

    /// Create a configuration with the default sweep parameters.
    pub fn new(start: Address) -> Self {
        Self {
            start,
            direction: Direction::Forward,
            count: Self::DEFAULT_COUNT,
            port: Port::HTTPS,
            workers: Self::DEFAULT_WORKERS,
            timeout: Self::DEFAULT_TIMEOUT,
            show_failures: false,
            queue_capacity: Self::DEFAULT_COUNT,
            progress: false,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.port = port;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Report failures and every completed handshake that passes the
    /// certificate filter.
    pub fn with_failures(mut self) -> Self {
        self.show_failures = true;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_progress(mut self) -> Self {
        self.progress = true;
        self
    }

    pub fn validate(&self) -> ScanResult<()> {
        if self.workers == 0 {
            return Err(ScanError::InvalidConfig("worker count must be at least 1".into()));
        }
        if self.count == 0 {
            return Err(ScanError::InvalidConfig("address count must be at least 1".into()));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig("timeout must be greater than zero".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ScanError::InvalidConfig("queue capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn report_policy(&self) -> ReportPolicy {
        ReportPolicy {
            show_failures: self.show_failures,
            port: self.port,
        }
    }
}

/// What a finished sweep did.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub start: Address,
    pub direction: Direction,
    pub port: Port,
    /// Addresses asked for.
    pub requested: usize,
    /// Addresses actually queued.
    pub enqueued: usize,
    /// Addresses a worker finished with.
    pub completed: usize,
    /// Probes that got through the TLS handshake.
    pub handshakes: usize,
    /// Lines handed to the sink.
    pub reported: usize,
    /// Lines the sink failed to record.
    pub sink_failures: usize,
    /// The cursor hit the edge of the address space before `requested`.
    pub exhausted: bool,
    /// Last address handed out by the cursor.
    pub last_address: Address,
    pub duration_ms: u64,
}

/// Execute a complete sweep.
///
/// Returns once every queued address has been probed and the sink has seen
/// every report line.
pub async fn run_scan<T, S>(config: ScanConfig, transport: Arc<T>, sink: S) -> ScanResult<ScanSummary>
where
    T: Transport + 'static,
    S: ResultSink + 'static,
{
    config.validate()?;
    let start_time = Instant::now();

    let capacity = config.queue_capacity.min(config.count);
    let (results_tx, results_rx) = mpsc::channel(capacity);
    let consumer = spawn_consumer(results_rx, sink);

    let progress = config.progress.then(|| progress_bar(config.count as u64));
    let wait_group = Arc::new(WaitGroup::new());
    let stats = Arc::new(PoolStats::default());

    let (queue_tx, queue_rx) = mpsc::channel::<Address>(capacity);
    let pool = WorkerPool::spawn(
        config.workers,
        queue_rx,
        ProbeJob {
            transport,
            policy: config.report_policy(),
            timeout: config.timeout,
            results: results_tx,
            wait_group: Arc::clone(&wait_group),
            stats: Arc::clone(&stats),
            progress: progress.clone(),
        },
    );
    debug!("started {} workers", pool.len());

    let cursor = AddressCursor::new(config.start);
    let mut enqueued = 0;
    let mut exhausted = false;
    let mut stopped = false;

    for _ in 0..config.count {
        let Some(address) = cursor.advance(config.direction) else {
            exhausted = true;
            break;
        };

        wait_group.add(1);
        if queue_tx.send(address).await.is_err() {
            wait_group.done();
            stopped = true;
            break;
        }
        enqueued += 1;
    }
    drop(queue_tx);

    if exhausted {
        warn!(
            "address space exhausted {} from {}: queued {} of {} addresses",
            config.direction, config.start, enqueued, config.count
        );
    }

    wait_group.wait().await;
    let crashed = pool.join().await;

    // The workers held the only result senders, so the consumer now drains
    // what is left and exits.
    let sink_stats = consumer.await.unwrap_or_else(|e| {
        error!("result consumer terminated abnormally: {}", e);
        SinkStats::default()
    });

    if let Some(pb) = progress {
        pb.finish_with_message("Scan complete");
    }

    if stopped || crashed > 0 {
        return Err(ScanError::PoolStopped);
    }

    let summary = ScanSummary {
        start: config.start,
        direction: config.direction,
        port: config.port,
        requested: config.count,
        enqueued,
        completed: stats.completed.load(Ordering::Relaxed),
        handshakes: stats.handshakes.load(Ordering::Relaxed),
        reported: stats.reported.load(Ordering::Relaxed),
        sink_failures: sink_stats.failed,
        exhausted,
        last_address: cursor.current(),
        duration_ms: start_time.elapsed().as_millis() as u64,
    };

    info!("Scan completed.");
    Ok(summary)
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}
