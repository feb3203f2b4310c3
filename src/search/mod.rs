//! Concurrent search engine over the 4-digit PIN space.
//!
//! - **WorkQueue**: hands out `0000`..=`9999` in ascending order, once each
//! - **WorkerPool**: fixed set of tokio workers pulling from the queue
//! - **AttemptExecutor**: one HTTP attempt per candidate with retry/backoff
//! - **SuccessDetector**: decides success and extracts the flag
//! - **Coordinator**: stop signal, found PINs, run phases and summary
//! - **ProgressReporter**: live status line plus permanent success lines
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!                      │ Coordinator  │◄──── Ctrl-C (interrupt)
//!                      └──────┬───────┘
//!                             │ stop signal
//!                      ┌──────▼───────┐
//!                      │  WorkQueue   │
//!                      └──────┬───────┘
//!         ┌───────────────────┼───────────────────┐
//!         ▼                   ▼                   ▼
//!    ┌─────────┐         ┌─────────┐         ┌─────────┐
//!    │ Worker 1│         │ Worker 2│         │ Worker N│
//!    └────┬────┘         └────┬────┘         └────┬────┘
//!         └──── AttemptExecutor → SuccessDetector ┘
//!                             │
//!                      ┌──────▼───────┐
//!                      │   Progress   │
//!                      │   Reporter   │
//!                      └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pin_forge::config::{SearchConfig, Target};
//! use pin_forge::search::{Coordinator, ProgressReporter, ReqwestTransport};
//!
//! let config = SearchConfig::for_target(&Target::new("10.10.10.5", 8080))?
//!     .with_stop_on_found(true);
//! let transport = Arc::new(ReqwestTransport::new(&config)?);
//! let coordinator = Arc::new(Coordinator::new(config)?);
//!
//! let summary = coordinator
//!     .run(transport, Arc::new(ProgressReporter::stdout()))
//!     .await?;
//! println!("found {:?}", summary.found);
//! ```

pub mod candidate;
pub mod coordinator;
pub mod detector;
pub mod executor;
pub mod progress;
pub mod queue;
pub mod worker_pool;

pub use candidate::{Candidate, PIN_SPACE};
pub use coordinator::{
    Coordinator, FoundPin, RunPhase, SearchSummary, StopSignal, TerminationReason,
};
pub use detector::{SuccessDetector, Verdict};
pub use executor::{
    AttemptExecutor, AttemptOutcome, AttemptStatus, BackoffPolicy, HttpReply, PinRequest,
    ReqwestTransport, Transport,
};
pub use progress::ProgressReporter;
pub use queue::WorkQueue;
pub use worker_pool::{PoolError, WorkerPool};
