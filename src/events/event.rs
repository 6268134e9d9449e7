//! # Runtime events emitted by the dispatcher, job runner and shutdown coordinator.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Discovery events**: the dispatcher found work or failed to look for it
//! - **Job lifecycle events**: one per handler start and exactly one terminal event per handler
//! - **Shutdown events**: shutdown requested, drained within grace, grace exceeded
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use jobvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::JobFailed)
//!     .with_job("Xb3_q")
//!     .with_reason("boom")
//!     .with_elapsed(Duration::from_millis(1500));
//!
//! assert_eq!(ev.kind, EventKind::JobFailed);
//! assert_eq!(ev.job.as_deref(), Some("Xb3_q"));
//! assert_eq!(ev.elapsed_ms, Some(1500));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Discovery events ===
    /// Source produced a job; a handler is about to be spawned.
    ///
    /// Sets: `job`, `in_flight` (count before admission)
    JobDiscovered,

    /// Source returned an error (or panicked); the dispatcher backs off.
    ///
    /// Sets: `reason`, `delay_ms` (backoff before the next poll)
    DiscoveryFailed,

    // === Job lifecycle events ===
    /// Handler started executing.
    ///
    /// Sets: `job`
    JobStarting,

    /// Handler finished normally.
    ///
    /// Sets: `job`, `elapsed_ms`
    JobCompleted,

    /// Handler failed or panicked.
    ///
    /// Sets: `job`, `reason`, `elapsed_ms`
    JobFailed,

    /// Handler was cancelled through its token.
    ///
    /// Sets: `job`, `elapsed_ms`
    JobCancelled,

    /// Handler stopped early after noticing the shutdown.
    ///
    /// Sets: `job`, `elapsed_ms`
    JobInterrupted,

    // === Shutdown events ===
    /// Shutdown flag was set; the dispatcher stops polling.
    ///
    /// Sets: `in_flight`
    ShutdownRequested,

    /// Dispatcher and all handlers stopped within the grace period.
    ///
    /// Sets: `elapsed_ms`
    AllStoppedWithin,

    /// Grace period ran out; forced cancellation follows.
    ///
    /// Sets: `in_flight` (handlers about to be cancelled), `elapsed_ms`
    GraceExceeded,

    /// Dispatcher loop returned.
    ///
    /// Sets: `reason` (`"drained"` or `"cancelled"`)
    DispatcherStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Job id, if applicable.
    pub job: Option<Arc<str>>,
    /// Human-readable reason (errors, exit cause).
    pub reason: Option<Arc<str>>,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: Option<u64>,
    /// Delay before the next action in milliseconds.
    pub delay_ms: Option<u64>,
    /// Number of in-flight handlers at the time of the event.
    pub in_flight: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            reason: None,
            elapsed_ms: None,
            delay_ms: None,
            in_flight: None,
        }
    }

    /// Alias of [`Event::new`].
    #[inline]
    pub fn now(kind: EventKind) -> Self {
        Self::new(kind)
    }

    #[inline]
    pub fn with_job(mut self, job: impl AsRef<str>) -> Self {
        self.job = Some(Arc::from(job.as_ref()));
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl AsRef<str>) -> Self {
        self.reason = Some(Arc::from(reason.as_ref()));
        self
    }

    /// Attaches an elapsed duration (saturates at `u64::MAX` ms).
    #[inline]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Attaches a delay (saturates at `u64::MAX` ms).
    #[inline]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[inline]
    pub fn with_in_flight(mut self, n: usize) -> Self {
        self.in_flight = Some(n);
        self
    }

    /// Returns `true` for the terminal job events (exactly one per handler).
    pub fn is_job_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::JobCompleted
                | EventKind::JobFailed
                | EventKind::JobCancelled
                | EventKind::JobInterrupted
        )
    }
}
