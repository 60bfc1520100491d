//! Fixed-size worker pool.
//!
//! Workers share one bounded queue receiver behind an async mutex and pull
//! addresses until the queue is closed and drained. Every dequeued address
//! is marked done on the shared [`WaitGroup`] exactly once, whether or not
//! it produced a report line.

use super::classify::{classify, probe, ReportLine, ReportPolicy};
use super::traits::Transport;
use crate::types::Address;
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Counts outstanding tasks; [`wait`](WaitGroup::wait) resolves at zero.
#[derive(Debug, Default)]
pub struct WaitGroup {
    pending: AtomicUsize,
    notify: Notify,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: usize) {
        self.pending.fetch_add(n, Ordering::AcqRel);
    }

    pub fn done(&self) {
        let previous = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "WaitGroup::done called more often than add");
        if previous == 1 {
            self.notify.notify_waiters();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait until the pending count is zero.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent `done` cannot be missed.
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Marks one task done when dropped, including during a panic unwind.
struct Completion<'a>(&'a WaitGroup);

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// The queue receiver plus the number of workers still pulling from it.
struct SharedQueue {
    rx: Mutex<mpsc::Receiver<Address>>,
    live: AtomicUsize,
}

/// Runs when a worker exits, normally or by panic. The last worker out
/// closes the queue and marks every address still buffered in it done.
struct WorkerExit<'a> {
    queue: &'a SharedQueue,
    wait_group: &'a WaitGroup,
}

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        if self.queue.live.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        // Workers only hold the lock while receiving, so it is free here.
        let Ok(mut rx) = self.queue.rx.try_lock() else {
            return;
        };

        rx.close();
        let mut abandoned = 0;
        while rx.try_recv().is_ok() {
            self.wait_group.done();
            abandoned += 1;
        }
        if abandoned > 0 {
            warn!("no workers left, abandoned {} queued addresses", abandoned);
        }
    }
}

/// Per-pool counters.
#[derive(Debug, Default)]
pub struct PoolStats {
    pub completed: AtomicUsize,
    pub handshakes: AtomicUsize,
    pub reported: AtomicUsize,
}

/// Everything a worker needs besides the queue.
pub struct ProbeJob<T> {
    pub transport: Arc<T>,
    pub policy: ReportPolicy,
    pub timeout: Duration,
    pub results: mpsc::Sender<ReportLine>,
    pub wait_group: Arc<WaitGroup>,
    pub stats: Arc<PoolStats>,
    pub progress: Option<ProgressBar>,
}

/// Handles to the running workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `workers` tasks draining `queue`.
    pub fn spawn<T>(workers: usize, queue: mpsc::Receiver<Address>, job: ProbeJob<T>) -> Self
    where
        T: Transport + 'static,
    {
        let queue = Arc::new(SharedQueue {
            rx: Mutex::new(queue),
            live: AtomicUsize::new(workers),
        });
        let job = Arc::new(job);

        let handles = (0..workers)
            .map(|id| {
                let queue = Arc::clone(&queue);
                let job = Arc::clone(&job);
                tokio::spawn(run_worker(id, queue, job))
            })
            .collect();

        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit and return how many died abnormally.
    /// Worker panics are logged, not propagated.
    pub async fn join(self) -> usize {
        let mut crashed = 0;
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                error!("scan worker terminated abnormally: {}", e);
                crashed += 1;
            }
        }
        crashed
    }
}

async fn run_worker<T>(id: usize, queue: Arc<SharedQueue>, job: Arc<ProbeJob<T>>)
where
    T: Transport + 'static,
{
    debug!("worker {} started", id);
    let _exit = WorkerExit {
        queue: &queue,
        wait_group: &job.wait_group,
    };

    loop {
        let next = {
            let mut rx = queue.rx.lock().await;
            rx.recv().await
        };
        let Some(address) = next else { break };

        let _completion = Completion(&job.wait_group);

        let result = probe(
            job.transport.as_ref(),
            address.into(),
            job.policy.port,
            job.timeout,
        )
        .await;

        if result.is_completed() {
            job.stats.handshakes.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(line) = classify(&result, &job.policy) {
            if job.results.send(line).await.is_ok() {
                job.stats.reported.fetch_add(1, Ordering::Relaxed);
            } else {
                warn!("result channel closed, dropping report for {}", address);
            }
        }

        job.stats.completed.fetch_add(1, Ordering::Relaxed);
        if let Some(progress) = &job.progress {
            progress.inc(1);
        }
    }

    debug!("worker {} finished", id);
}
