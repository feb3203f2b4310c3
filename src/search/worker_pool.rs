//! Fixed-size pool of search workers.
//!
//! Each worker runs as an independent tokio task that pulls candidates from
//! the shared [`WorkQueue`] until the queue is exhausted or a stop is
//! requested. There is no separate shutdown channel: the coordinator's stop
//! signal drains the queue, and in-flight attempts run to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::coordinator::Coordinator;
use super::executor::AttemptExecutor;
use super::progress::ProgressReporter;
use super::queue::WorkQueue;

/// Errors that can occur in the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Pool is already running.
    #[error("Pool is already running")]
    AlreadyRunning,

    /// Pool is not running.
    #[error("Pool is not running")]
    NotRunning,

    /// A worker task panicked or was aborted.
    #[error("Worker task failed: {0}")]
    WorkerFailed(String),
}

/// Worker pool bound to one search run.
pub struct WorkerPool {
    num_workers: usize,
    queue: Arc<WorkQueue>,
    executor: Arc<AttemptExecutor>,
    coordinator: Arc<Coordinator>,
    reporter: Arc<ProgressReporter>,
    worker_handles: Vec<JoinHandle<()>>,
    is_running: AtomicBool,
}

impl WorkerPool {
    /// Creates a pool of `num_workers`; nothing is spawned before
    /// [`WorkerPool::start`].
    pub fn new(
        num_workers: usize,
        queue: Arc<WorkQueue>,
        executor: Arc<AttemptExecutor>,
        coordinator: Arc<Coordinator>,
        reporter: Arc<ProgressReporter>,
    ) -> Self {
        Self {
            num_workers,
            queue,
            executor,
            coordinator,
            reporter,
            worker_handles: Vec::new(),
            is_running: AtomicBool::new(false),
        }
    }

    /// Spawns all workers; they start pulling candidates immediately.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::AlreadyRunning` if the pool is already running.
    pub fn start(&mut self) -> Result<(), PoolError> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(PoolError::AlreadyRunning);
        }

        for i in 0..self.num_workers {
            let worker = Worker {
                id: format!("worker-{}", i),
                queue: Arc::clone(&self.queue),
                executor: Arc::clone(&self.executor),
                coordinator: Arc::clone(&self.coordinator),
                reporter: Arc::clone(&self.reporter),
            };

            let handle = tokio::spawn(async move {
                worker.run().await;
            });
            self.worker_handles.push(handle);
        }

        info!(num_workers = self.num_workers, "Worker pool started");
        Ok(())
    }

    /// Waits until every worker has exited on its own (queue exhausted or
    /// stop observed).
    pub async fn join(&mut self) -> Result<(), PoolError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::NotRunning);
        }

        let mut failure = None;
        for handle in self.worker_handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task failed");
                failure.get_or_insert_with(|| e.to_string());
            }
        }
        self.is_running.store(false, Ordering::SeqCst);
        debug!("Worker pool drained");

        match failure {
            Some(reason) => Err(PoolError::WorkerFailed(reason)),
            None => Ok(()),
        }
    }
}

/// A single worker pulling candidates until exhaustion or stop.
struct Worker {
    id: String,
    queue: Arc<WorkQueue>,
    executor: Arc<AttemptExecutor>,
    coordinator: Arc<Coordinator>,
    reporter: Arc<ProgressReporter>,
}

impl Worker {
    /// Main worker loop.
    async fn run(self) {
        debug!(worker_id = %self.id, "Worker started");

        while let Some(candidate) = self.queue.next() {
            let outcome = self.executor.attempt(candidate).await;
            self.coordinator.record_attempt(&outcome);

            if outcome.is_success() {
                if self
                    .coordinator
                    .record_success(candidate, outcome.flag.clone())
                {
                    info!(worker_id = %self.id, pin = %candidate, "PIN accepted");
                    self.reporter.report_found(candidate, outcome.flag.as_deref());
                }
            } else {
                // Debug only: stderr shares the terminal with the live line.
                if outcome.is_fatal() {
                    debug!(
                        worker_id = %self.id,
                        pin = %candidate,
                        retries = outcome.retries,
                        error = ?outcome.error,
                        "Candidate abandoned after retries"
                    );
                }
                self.reporter
                    .report_live(&outcome, self.coordinator.attempts_completed());
            }

            if self.coordinator.is_stop_requested() {
                break;
            }
        }

        debug!(worker_id = %self.id, "Worker stopped");
    }
}
