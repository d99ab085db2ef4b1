//! Iterator worker pool - fixed set of workers consuming one bounded queue
//!
//! Worker lifecycle: idle → waiting-for-listener → producing → idle,
//! ending in stopped once it dequeues a [`PendingQuery::Stop`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_channel::{bounded, Receiver, Sender};
use contracts::{IteratorHandler, IteratorResult, QueryContext, QueryError, SharedQuery};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::chain::run_iterator_handlers;
use crate::fanout::ErrorFanout;
use crate::metrics::BusMetrics;

/// Work-queue element
pub enum PendingQuery {
    /// A streaming query waiting for a worker
    Run(PendingRun),
    /// Sentinel telling the receiving worker to exit
    Stop,
}

/// Envelope of one streaming query
pub struct PendingRun {
    pub ctx: QueryContext,
    pub query: SharedQuery,
    pub result: IteratorResult,
}

/// State shared by every worker of a pool
pub struct WorkerShared {
    pub handlers: Arc<[Arc<dyn IteratorHandler>]>,
    pub errors: ErrorFanout,
    pub metrics: Arc<BusMetrics>,
    pub shutting_down: Arc<AtomicBool>,
    pub listener_timeout: Duration,
}

impl WorkerShared {
    async fn process(&self, run: PendingRun) {
        let PendingRun {
            ctx,
            query,
            mut result,
        } = run;

        // Work still queued once the drain started is disregarded;
        // dropping the result closes the consumer's stream.
        if self.shutting_down.load(Ordering::Acquire) {
            debug!(query_id = %query.id_string(), "Discarding iterator query during shutdown");
            return;
        }

        if !result.wait_listener(self.listener_timeout).await {
            self.metrics.inc_iterator_timeouts();
            let waited_ms = u64::try_from(self.listener_timeout.as_millis()).unwrap_or(u64::MAX);
            let err = QueryError::query_timed_out(query.id_string(), waited_ms);
            self.errors.report(&ctx, query.as_ref(), &err).await;
            result.close();
            return;
        }

        let outcome =
            run_iterator_handlers(&self.handlers, &self.errors, &ctx, query.as_ref(), &mut result)
                .await;
        result.close();

        if outcome.is_ok() {
            self.metrics.inc_iterator_completed();
        }
    }
}

/// Handle to a running worker pool
pub struct WorkerPool {
    /// Work queue shared by every worker
    queue: Sender<PendingQuery>,
    /// One acknowledgment per stopped worker
    closed_rx: mpsc::Receiver<()>,
    /// Worker task handles
    worker_handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Create the queue and spawn `size` workers
    ///
    /// `workers` is incremented once per spawned worker.
    pub fn spawn(
        size: usize,
        queue_capacity: usize,
        shared: Arc<WorkerShared>,
        workers: &AtomicUsize,
    ) -> Self {
        let (queue, rx) = bounded(queue_capacity.max(1));
        let (closed_tx, closed_rx) = mpsc::channel(size.max(1));

        let worker_handles = (0..size)
            .map(|id| {
                workers.fetch_add(1, Ordering::AcqRel);
                let rx = rx.clone();
                let closed_tx = closed_tx.clone();
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    iterator_worker(id, rx, closed_tx, shared).await;
                })
            })
            .collect();

        Self {
            queue,
            closed_rx,
            worker_handles,
        }
    }

    /// Sender side of the work queue
    pub fn sender(&self) -> Sender<PendingQuery> {
        self.queue.clone()
    }

    /// Number of requests waiting in the queue
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Stop every worker: one sentinel and one acknowledgment per live worker
    #[instrument(name = "worker_pool_drain", skip_all)]
    pub async fn drain(mut self, workers: &AtomicUsize) {
        while workers.load(Ordering::Acquire) > 0 {
            if self.queue.send(PendingQuery::Stop).await.is_err() {
                break;
            }
            if self.closed_rx.recv().await.is_none() {
                break;
            }
            workers.fetch_sub(1, Ordering::AcqRel);
        }

        let lost = workers.swap(0, Ordering::AcqRel);
        if lost > 0 {
            warn!(lost, "Workers exited without acknowledging shutdown");
        }

        for handle in self.worker_handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = ?e, "Worker task panicked");
            }
        }
        debug!("Worker pool drained");
    }
}

/// Worker task that consumes pending iterator queries
#[instrument(name = "iterator_worker_loop", skip(queue, closed, shared), fields(worker = id))]
async fn iterator_worker(
    id: usize,
    queue: Receiver<PendingQuery>,
    closed: mpsc::Sender<()>,
    shared: Arc<WorkerShared>,
) {
    debug!(worker = id, "Iterator worker started");

    while let Ok(pending) = queue.recv().await {
        match pending {
            PendingQuery::Run(run) => shared.process(run).await,
            PendingQuery::Stop => break,
        }
    }

    if closed.send(()).await.is_err() {
        debug!(worker = id, "Pool dropped before acknowledgment");
    }

    debug!(worker = id, "Iterator worker stopped");
}
