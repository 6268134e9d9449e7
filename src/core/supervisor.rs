//! # Supervisor: lifecycle hooks and the shutdown coordinator.
//!
//! The [`Supervisor`] owns the job source, the handler, the in-flight ledger, the
//! shutdown flag and the event bus. The host calls [`Supervisor::start`] once at
//! startup and [`Supervisor::stop`] once at shutdown.
//!
//! ## High-level architecture
//! ```text
//! start():
//!   tokio::spawn(Dispatcher::run())  ──► JobSource ──► Job ──► JoinSet ──► run_job()
//!                                                                (child token per job)
//!
//! stop() / shutdown_and_wait():
//!   ShutdownFlag::trigger()  (captures started_at)
//!     └─► publish ShutdownRequested
//!     └─► wait for the dispatcher until started_at + grace
//!            ├─ finished  → publish AllStoppedWithin          forced = false
//!            └─ deadline  → publish GraceExceeded
//!                           runtime_token.cancel() → dispatcher + every handler
//!                           await dispatcher                   forced = true
//! ```
//!
//! `stop()` always returns: after the deadline only cooperative cancellation
//! remains, and every handler is raced against its cancelled token.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use jobvisor::{Supervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig {
//!         max_job_duration: Duration::from_millis(20),
//!         grace: Duration::from_millis(200),
//!         ..SupervisorConfig::default()
//!     };
//!
//!     let sup = Supervisor::builder(cfg).build();
//!     sup.start()?;
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!
//!     let report = sup.stop().await?;
//!     assert!(report.elapsed <= Duration::from_millis(250));
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::builder::SupervisorBuilder;
use crate::core::config::SupervisorConfig;
use crate::core::dispatcher::{Dispatcher, DispatcherExit};
use crate::core::in_flight::{InFlight, InFlightSnapshot};
use crate::core::shutdown::ShutdownFlag;
use crate::core::signal;
use crate::core::state::{StateCell, SupervisorState};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{HandlerRef, JobSource};

/// Summary of a completed shutdown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    /// `true` when the grace period ran out and the dispatcher was cancelled.
    pub forced: bool,
    /// Time from setting the shutdown flag until `stop()` returned.
    pub elapsed: Duration,
    /// Handlers still in flight when forced cancellation began (`0` if not forced).
    pub abandoned: usize,
}

/// Owns the dispatcher and coordinates its graceful, time-bounded shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    source: Arc<dyn JobSource>,
    handler: HandlerRef,
    in_flight: Arc<InFlight>,
    state: Arc<StateCell>,
    shutdown: Arc<ShutdownFlag>,
    runtime_token: CancellationToken,
    dispatcher: Mutex<Option<JoinHandle<DispatcherExit>>>,
}

impl Supervisor {
    /// Returns a builder; unset collaborators default to
    /// [`RandomJobSource`](crate::RandomJobSource) and [`SimulatedHandler`](crate::SimulatedHandler).
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        source: Arc<dyn JobSource>,
        handler: HandlerRef,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            cfg,
            bus,
            source,
            handler,
            in_flight: InFlight::new(),
            state: Arc::new(StateCell::new()),
            shutdown: Arc::new(ShutdownFlag::default()),
            runtime_token: CancellationToken::new(),
            dispatcher: Mutex::new(None),
        }
    }

    /// Starts the dispatcher as a background task and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), RuntimeError> {
        if self.shutdown.is_set() {
            return Err(RuntimeError::ShuttingDown);
        }
        let mut slot = self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() || self.state.get() != SupervisorState::Idle {
            return Err(RuntimeError::AlreadyStarted);
        }

        let dispatcher = Dispatcher {
            cfg: self.cfg.clone(),
            source: Arc::clone(&self.source),
            handler: Arc::clone(&self.handler),
            in_flight: Arc::clone(&self.in_flight),
            shutdown: Arc::clone(&self.shutdown),
            state: Arc::clone(&self.state),
            bus: self.bus.clone(),
            runtime_token: self.runtime_token.clone(),
        };
        self.state.set(SupervisorState::Running);
        *slot = Some(tokio::spawn(dispatcher.run()));
        info!(grace = ?self.cfg.grace, max_in_flight = self.cfg.max_in_flight, "job supervisor started");
        Ok(())
    }

    /// Stops the dispatcher: drain within the grace period, then cancel.
    ///
    /// Returns [`RuntimeError::NotRunning`] if the supervisor was never started or
    /// was already stopped.
    pub async fn stop(&self) -> Result<ShutdownReport, RuntimeError> {
        let mut handle = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(RuntimeError::NotRunning)?;

        let (started_at, _) = self.shutdown.trigger();
        let deadline = self
            .shutdown
            .deadline(self.cfg.grace)
            .unwrap_or(started_at + self.cfg.grace);
        let in_flight = self.in_flight.len();
        info!(in_flight, grace = ?self.cfg.grace, "starting shutdown");
        self.bus
            .publish(Event::now(EventKind::ShutdownRequested).with_in_flight(in_flight));

        let (forced, abandoned) = match time::timeout_at(deadline, &mut handle).await {
            Ok(joined) => {
                report_exit(joined);
                (false, 0)
            }
            Err(_elapsed) => {
                let abandoned = self.in_flight.len();
                info!(abandoned, "graceful shutdown wait time exceeded, cancelling dispatcher");
                self.bus.publish(
                    Event::now(EventKind::GraceExceeded)
                        .with_in_flight(abandoned)
                        .with_elapsed(started_at.elapsed()),
                );
                self.runtime_token.cancel();
                report_exit(handle.await);
                (true, abandoned)
            }
        };

        let elapsed = started_at.elapsed();
        if !forced {
            self.bus
                .publish(Event::now(EventKind::AllStoppedWithin).with_elapsed(elapsed));
        }
        info!(forced, elapsed_ms = elapsed.as_millis() as u64, "shutdown complete");
        Ok(ShutdownReport {
            forced,
            elapsed,
            abandoned,
        })
    }

    /// Alias of [`Supervisor::stop`].
    pub async fn shutdown_and_wait(&self) -> Result<ShutdownReport, RuntimeError> {
        self.stop().await
    }

    /// Starts, waits for a termination signal, then stops.
    ///
    /// If signal listeners cannot be registered the failure is logged and shutdown
    /// begins immediately.
    pub async fn run_until_signal(&self) -> Result<ShutdownReport, RuntimeError> {
        self.start()?;
        match signal::wait_for_termination().await {
            Ok(name) => info!(signal = name, "termination signal received"),
            Err(e) => warn!(error = %e, "cannot listen for termination signals; shutting down"),
        }
        self.stop().await
    }

    pub fn state(&self) -> SupervisorState {
        self.state.get()
    }

    /// Number of handlers currently executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Consistent view of the in-flight set and lifetime counters.
    pub fn snapshot(&self) -> InFlightSnapshot {
        self.in_flight.snapshot()
    }

    /// Subscribes to runtime events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_set()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}

/// Logs how the dispatcher task ended. Never fails the shutdown.
fn report_exit(joined: Result<DispatcherExit, JoinError>) {
    match joined {
        Ok(DispatcherExit::Drained) => info!("dispatcher drained"),
        Ok(DispatcherExit::Cancelled) => info!("dispatcher is cancelled"),
        Err(e) if e.is_cancelled() => info!("dispatcher task is cancelled"),
        Err(e) => error!(error = %e, "dispatcher terminated with an exception"),
    }
}
