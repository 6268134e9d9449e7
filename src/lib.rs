//! # jobvisor
//!
//! **Jobvisor** is an in-process async job supervisor for tokio services.
//!
//! A single dispatcher discovers work at a variable rate, launches one concurrent
//! handler per job, tracks the handlers in flight, and shuts down within a bounded
//! grace period, cancelling whatever is still running.
//!
//! ## Architecture
//! ```text
//!  host startup                                   host shutdown
//!       │                                               │
//!       ▼                                               ▼
//! Supervisor::start()                           Supervisor::stop()
//!       │                                      ├─ set shutdown flag
//!       ▼                                      ├─ wait ≤ grace
//! ┌──────────────────────────────┐             └─ cancel runtime token
//! │ Dispatcher (poll loop)       │◄──────────────────────┘
//! │  JobSource::discover(n) ─────┼─► Job
//! │  InFlight::admit(job)        │
//! │  JoinSet::spawn(run_job) ────┼─► JobHandler::run(job, child token)
//! └──────────────────────────────┘         │
//!                                          ▼
//!                              JobOutcome ─► completion hook
//!                                            (log, Event, release from InFlight)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Idle ─► Running ─► Draining ─► Terminated
//!            │                       ▲
//!            └── forced cancellation ┘
//! ```
//!
//! ## Features
//! | Area              | Description                                                | Key types                                   |
//! |-------------------|------------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | Start/stop hooks, graceful shutdown with forced fallback   | [`Supervisor`], [`ShutdownReport`]          |
//! | **Discovery**     | Load-based admission of new work                           | [`JobSource`], [`RandomJobSource`]          |
//! | **Execution**     | Cancellable handlers, closures or simulated work           | [`JobHandler`], [`HandlerFn`], [`SimulatedHandler`] |
//! | **Outcomes**      | Tagged terminal states instead of error matching           | [`JobOutcome`], [`JobError`]                |
//! | **Events**        | Broadcast stream of lifecycle events                       | [`Event`], [`EventKind`]                    |
//! | **Configuration** | Every wait and threshold in one struct                     | [`SupervisorConfig`]                        |
//!
//! Logging goes through [`tracing`]; install a subscriber in the host to see it.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use jobvisor::{HandlerFn, Job, JobError, JobReport, Supervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig {
//!         grace: Duration::from_secs(1),
//!         ..SupervisorConfig::default()
//!     };
//!
//!     let print = HandlerFn::arc(|job: Job, ctx: CancellationToken| async move {
//!         tokio::select! {
//!             _ = ctx.cancelled() => Err(JobError::Canceled),
//!             _ = tokio::time::sleep(Duration::from_millis(10)) => {
//!                 Ok(JobReport { job, elapsed: Duration::from_millis(10) })
//!             }
//!         }
//!     });
//!
//!     let sup = Supervisor::builder(cfg).with_handler(print).build();
//!     sup.start()?;
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!
//!     let report = sup.stop().await?;
//!     assert!(!report.forced);
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod jobs;

// ---- Public re-exports ----

pub use core::{
    DEFAULT_JOB_NAME, InFlightSnapshot, ShutdownReport, Supervisor, SupervisorBuilder,
    SupervisorConfig, SupervisorState,
};
pub use error::{DiscoveryError, JobError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{
    HandlerFn, HandlerRef, JOB_ID_ENTROPY, Job, JobHandler, JobId, JobOutcome, JobReport,
    JobSource, RandomJobSource, SimulatedHandler,
};
