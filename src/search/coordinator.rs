//! Run coordination: shared stop signal, found PINs and the final summary.
//!
//! A run moves through `Running → StopRequested → Drained → Done`. The stop
//! signal is soft: it only prevents new candidates from being dispatched,
//! attempts already in flight finish normally.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::info;

use super::candidate::Candidate;
use super::executor::{AttemptExecutor, AttemptOutcome, Transport};
use super::progress::ProgressReporter;
use super::queue::WorkQueue;
use super::worker_pool::{PoolError, WorkerPool};
use crate::config::SearchConfig;
use crate::error::ConfigError;

/// Monotonic, cloneable stop flag. Once raised it stays raised.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Running,
    StopRequested,
    Drained,
    Done,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Every candidate was tried.
    Exhausted,
    /// A PIN was found with stop-on-found enabled.
    FoundAndStopped,
    /// Stopped from outside (Ctrl-C).
    Interrupted,
}

/// A PIN the endpoint accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundPin {
    pub pin: Candidate,
    pub flag: Option<String>,
}

/// Final record of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    pub started_at: DateTime<Utc>,
    pub total_attempts: u64,
    pub fatal_attempts: u64,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Ascending by PIN.
    pub found: Vec<FoundPin>,
    pub termination: TerminationReason,
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

#[derive(Debug)]
struct Ledger {
    phase: RunPhase,
    stop_reason: Option<TerminationReason>,
    found: Vec<FoundPin>,
}

/// Mutable state shared by all workers of a run.
#[derive(Debug)]
struct SearchState {
    attempts_completed: AtomicU64,
    fatal_attempts: AtomicU64,
    ledger: Mutex<Ledger>,
}

impl SearchState {
    fn new() -> Self {
        Self {
            attempts_completed: AtomicU64::new(0),
            fatal_attempts: AtomicU64::new(0),
            ledger: Mutex::new(Ledger {
                phase: RunPhase::Running,
                stop_reason: None,
                found: Vec::new(),
            }),
        }
    }
}

/// Owns the configuration and shared state of one search run.
#[derive(Debug)]
pub struct Coordinator {
    config: SearchConfig,
    stop: StopSignal,
    state: SearchState,
    started: AtomicBool,
}

impl Coordinator {
    /// Validates `config`; no run can start from an invalid configuration.
    pub fn new(config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            stop: StopSignal::new(),
            state: SearchState::new(),
            started: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.state
            .ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the run to `StopRequested`. The first reason wins.
    pub fn request_stop(&self, reason: TerminationReason) {
        {
            let mut ledger = self.ledger();
            if ledger.stop_reason.is_none() {
                ledger.stop_reason = Some(reason);
            }
            if ledger.phase == RunPhase::Running {
                ledger.phase = RunPhase::StopRequested;
            }
        }
        self.stop.raise();
    }

    /// External interrupt (Ctrl-C).
    pub fn interrupt(&self) {
        info!("Stop requested by user");
        self.request_stop(TerminationReason::Interrupted);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_raised()
    }

    /// Records one completed attempt, whatever its status.
    pub fn record_attempt(&self, outcome: &AttemptOutcome) {
        self.state.attempts_completed.fetch_add(1, Ordering::SeqCst);
        if outcome.is_fatal() {
            self.state.fatal_attempts.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Records an accepted PIN. Returns `false` when it was already known.
    ///
    /// With stop-on-found, the first recorded PIN requests a stop.
    pub fn record_success(&self, pin: Candidate, flag: Option<String>) -> bool {
        let inserted = {
            let mut ledger = self.ledger();
            match ledger.found.binary_search_by_key(&pin, |f| f.pin) {
                Ok(_) => false,
                Err(index) => {
                    ledger.found.insert(index, FoundPin { pin, flag });
                    true
                }
            }
        };

        if inserted && self.config.stop_on_found {
            self.request_stop(TerminationReason::FoundAndStopped);
        }
        inserted
    }

    pub fn attempts_completed(&self) -> u64 {
        self.state.attempts_completed.load(Ordering::SeqCst)
    }

    pub fn found(&self) -> Vec<FoundPin> {
        self.ledger().found.clone()
    }

    pub fn phase(&self) -> RunPhase {
        self.ledger().phase
    }

    fn mark_drained(&self) {
        let mut ledger = self.ledger();
        if matches!(ledger.phase, RunPhase::Running | RunPhase::StopRequested) {
            ledger.phase = RunPhase::Drained;
        }
    }

    fn finish(&self, started_at: DateTime<Utc>, elapsed: Duration) -> SearchSummary {
        let mut ledger = self.ledger();
        ledger.phase = RunPhase::Done;
        SearchSummary {
            started_at,
            total_attempts: self.attempts_completed(),
            fatal_attempts: self.state.fatal_attempts.load(Ordering::SeqCst),
            elapsed,
            found: ledger.found.clone(),
            termination: ledger.stop_reason.unwrap_or(TerminationReason::Exhausted),
        }
    }

    /// Runs the whole search: starts the pool, waits for it to drain and
    /// reports the summary. A coordinator runs at most once.
    pub async fn run(
        self: &Arc<Self>,
        transport: Arc<dyn Transport>,
        reporter: Arc<ProgressReporter>,
    ) -> Result<SearchSummary, PoolError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PoolError::AlreadyRunning);
        }

        let started_at = Utc::now();
        let clock = Instant::now();

        let queue = Arc::new(WorkQueue::new(self.stop_signal()));
        let executor = Arc::new(AttemptExecutor::new(&self.config, transport));
        let mut pool = WorkerPool::new(
            self.config.thread_count,
            Arc::clone(&queue),
            executor,
            Arc::clone(self),
            Arc::clone(&reporter),
        );

        info!(
            target_url = %self.config.target_url,
            method = %self.config.method,
            threads = self.config.thread_count,
            "Starting PIN search"
        );

        pool.start()?;
        let joined = pool.join().await;
        self.mark_drained();
        reporter.finish_live();
        joined?;

        let summary = self.finish(started_at, clock.elapsed());
        info!(
            attempts = summary.total_attempts,
            fatal = summary.fatal_attempts,
            found = summary.found.len(),
            termination = ?summary.termination,
            remaining = queue.remaining(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "PIN search finished"
        );
        Ok(summary)
    }
}
