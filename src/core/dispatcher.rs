//! # Dispatcher: the poll loop.
//!
//! Polls a [`JobSource`], launches one handler per discovered job into a task group it
//! owns, and winds down on shutdown.
//!
//! ## Architecture
//! ```text
//! Supervisor::start() ──► tokio::spawn(Dispatcher::run())
//!
//! Running:
//! loop {
//!   ├─► reap finished handlers (non-blocking)
//!   ├─► shutdown flag set? ──► break
//!   ├─► source.discover(in_flight)
//!   │     ├─ Some(job) ─► admit to in-flight set ─► spawn run_job(child token) ─► yield
//!   │     ├─ None      ─► sleep(poll_interval)   (ends early on shutdown)
//!   │     └─ Err/panic ─► DiscoveryFailed ─► sleep(error_backoff) (ends early on shutdown)
//! }
//! Draining:
//!   join every handler ─► Terminated
//!
//! Forced cancellation (runtime token), observed at every await:
//!   child tokens fire ─► handlers report Cancelled ─► join ─► Terminated
//! ```
//!
//! ## Rules
//! - Discovery errors never end the loop
//! - Forced cancellation is never routed through the discovery-error path
//! - Every handler is a child of the dispatcher: dropping the dispatcher aborts them

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::config::SupervisorConfig;
use crate::core::in_flight::InFlight;
use crate::core::runner::run_job;
use crate::core::shutdown::ShutdownFlag;
use crate::core::state::{StateCell, SupervisorState};
use crate::error::{DiscoveryError, panic_reason};
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{HandlerRef, Job, JobOutcome, JobSource};

/// Why the dispatcher loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatcherExit {
    /// Shutdown flag observed and every handler finished on its own.
    Drained,
    /// Runtime token cancelled; handlers were cancelled with it.
    Cancelled,
}

impl DispatcherExit {
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            DispatcherExit::Drained => "drained",
            DispatcherExit::Cancelled => "cancelled",
        }
    }
}

/// Everything the poll loop needs, cloned out of the supervisor at `start()`.
pub(crate) struct Dispatcher {
    pub(crate) cfg: SupervisorConfig,
    pub(crate) source: Arc<dyn JobSource>,
    pub(crate) handler: HandlerRef,
    pub(crate) in_flight: Arc<InFlight>,
    pub(crate) shutdown: Arc<ShutdownFlag>,
    pub(crate) state: Arc<StateCell>,
    pub(crate) bus: Bus,
    pub(crate) runtime_token: CancellationToken,
}

impl Dispatcher {
    /// Runs until drained or cancelled.
    pub(crate) async fn run(self) -> DispatcherExit {
        self.state.set(SupervisorState::Running);
        let mut handlers: JoinSet<JobOutcome> = JoinSet::new();

        let polled = tokio::select! {
            biased;
            _ = self.runtime_token.cancelled() => false,
            _ = self.poll(&mut handlers) => true,
        };

        let exit = if polled {
            self.state.set(SupervisorState::Draining);
            info!(in_flight = self.in_flight.len(), "dispatcher draining");
            tokio::select! {
                biased;
                _ = self.runtime_token.cancelled() => DispatcherExit::Cancelled,
                _ = join_all(&mut handlers) => DispatcherExit::Drained,
            }
        } else {
            DispatcherExit::Cancelled
        };

        if exit == DispatcherExit::Cancelled {
            info!(in_flight = self.in_flight.len(), "dispatcher cancelled");
            // Child tokens are cancelled with the runtime token; each handler
            // reports Cancelled at its next poll.
            join_all(&mut handlers).await;
        } else {
            info!("dispatcher shutdown");
        }

        self.state.set(SupervisorState::Terminated);
        self.bus
            .publish(Event::now(EventKind::DispatcherStopped).with_reason(exit.as_label()));
        exit
    }

    /// Polls until the shutdown flag is observed.
    async fn poll(&self, handlers: &mut JoinSet<JobOutcome>) {
        loop {
            reap(handlers);
            if self.shutdown.is_set() {
                break;
            }

            match self.dispatch_once(handlers) {
                Ok(true) => tokio::task::yield_now().await,
                Ok(false) => self.pause(self.cfg.poll_interval).await,
                Err(e) => {
                    warn!(error = %e, label = e.as_label(), backoff = ?self.cfg.error_backoff, "job discovery failed");
                    self.bus.publish(
                        Event::now(EventKind::DiscoveryFailed)
                            .with_reason(e.to_string())
                            .with_delay(self.cfg.error_backoff),
                    );
                    self.pause(self.cfg.error_backoff).await;
                }
            }
        }
    }

    /// One discovery step. Returns whether a handler was launched.
    fn dispatch_once(&self, handlers: &mut JoinSet<JobOutcome>) -> Result<bool, DiscoveryError> {
        let in_flight = self.in_flight.len();
        let Some(job) = self.discover(in_flight)? else {
            return Ok(false);
        };

        info!(job_id = %job.id(), in_flight, "found new job to process, currently running {in_flight} jobs");
        self.bus.publish(
            Event::now(EventKind::JobDiscovered)
                .with_job(job.id().as_str())
                .with_in_flight(in_flight),
        );

        let guard = self.in_flight.admit(&job);
        let ctx = self.runtime_token.child_token();
        handlers.spawn(run_job(
            Arc::clone(&self.handler),
            job,
            ctx,
            guard,
            self.bus.clone(),
        ));
        Ok(true)
    }

    fn discover(&self, in_flight: usize) -> Result<Option<Job>, DiscoveryError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.source.discover(in_flight))).unwrap_or_else(
            |payload| {
                Err(DiscoveryError::Panicked {
                    reason: panic_reason(payload.as_ref()),
                })
            },
        )
    }

    /// Sleeps for `delay`, waking early once the shutdown flag is set.
    async fn pause(&self, delay: Duration) {
        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = self.shutdown.wait() => {}
        }
    }
}

/// Collects handlers that already finished without waiting for the rest.
fn reap(handlers: &mut JoinSet<JobOutcome>) {
    while let Some(res) = handlers.try_join_next() {
        log_join(res);
    }
}

async fn join_all(handlers: &mut JoinSet<JobOutcome>) {
    while let Some(res) = handlers.join_next().await {
        log_join(res);
    }
}

fn log_join(res: Result<JobOutcome, tokio::task::JoinError>) {
    match res {
        Ok(outcome) => debug!(outcome = outcome.as_label(), "handler reaped"),
        Err(e) if e.is_cancelled() => debug!("handler aborted"),
        Err(e) => error!(error = %e, "handler task failed outside the runner"),
    }
}
