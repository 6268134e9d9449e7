//! # Run a single job handler invocation.
//!
//! Executes one [`Job`] on a [`JobHandler`], converts the result into a [`JobOutcome`],
//! and runs the completion hook: logging, event publishing and release from the
//! in-flight ledger.
//!
//! ## Event flow
//!
//! ```text
//! publish JobStarting
//!   handler.run(job, child token)
//!     ├─ Ok(report)          → JobCompleted   (info)
//!     ├─ Err(Fail) / panic   → JobFailed      (error, with job id)
//!     ├─ Err(Canceled)/token → JobCancelled   (debug)
//!     └─ Err(Interrupted)    → JobInterrupted (debug)
//! drop(InFlightGuard)        → removed from the in-flight set
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event per invocation
//! - Cancellation is never reported as a failure
//! - The token is raced against the handler, so a handler that ignores it still stops
//!   at its next suspension point
//! - Panics are caught and reported as [`JobError::Panicked`]

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::core::in_flight::InFlightGuard;
use crate::error::{JobError, panic_reason};
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{HandlerRef, Job, JobOutcome};

/// Executes `job` and reports its outcome.
///
/// `guard` is the job's membership in the in-flight set; it is released after the
/// terminal event is published (or when this future is dropped).
pub(crate) async fn run_job(
    handler: HandlerRef,
    job: Job,
    ctx: CancellationToken,
    guard: InFlightGuard,
    bus: Bus,
) -> JobOutcome {
    bus.publish(Event::now(EventKind::JobStarting).with_job(job.id().as_str()));
    let started = Instant::now();

    let attempt = AssertUnwindSafe(handler.run(job.clone(), ctx.clone())).catch_unwind();
    let outcome = tokio::select! {
        biased;
        _ = ctx.cancelled() => JobOutcome::Cancelled,
        res = attempt => match res {
            Ok(res) => JobOutcome::from(res),
            Err(payload) => JobOutcome::Failed(JobError::Panicked {
                reason: panic_reason(payload.as_ref()),
            }),
        },
    };

    report(&bus, &job, &outcome, started.elapsed());
    drop(guard);
    outcome
}

/// Completion hook: one log record and one terminal event per outcome.
fn report(bus: &Bus, job: &Job, outcome: &JobOutcome, elapsed: Duration) {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let id = job.id().as_str();
    match outcome {
        JobOutcome::Completed(_) => {
            info!(job_id = id, elapsed_ms, "job completed: {job}");
            bus.publish(
                Event::now(EventKind::JobCompleted)
                    .with_job(id)
                    .with_elapsed(elapsed),
            );
        }
        JobOutcome::Failed(err) => {
            error!(job_id = id, elapsed_ms, error = %err, label = err.as_label(), "exception raised by job: {job}");
            bus.publish(
                Event::now(EventKind::JobFailed)
                    .with_job(id)
                    .with_reason(err.to_string())
                    .with_elapsed(elapsed),
            );
        }
        JobOutcome::Cancelled => {
            debug!(job_id = id, elapsed_ms, "job cancelled: {job}");
            bus.publish(
                Event::now(EventKind::JobCancelled)
                    .with_job(id)
                    .with_elapsed(elapsed),
            );
        }
        JobOutcome::Interrupted => {
            debug!(job_id = id, elapsed_ms, "job interrupted by shutdown: {job}");
            bus.publish(
                Event::now(EventKind::JobInterrupted)
                    .with_job(id)
                    .with_elapsed(elapsed),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::in_flight::InFlight;
    use crate::jobs::{HandlerFn, JobId, JobReport};

    fn job() -> Job {
        Job::new(JobId::from_entropy([9; 16]), "runner-test")
    }

    async fn run_with(handler: HandlerRef, ctx: CancellationToken) -> (JobOutcome, Vec<Event>, Arc<InFlight>) {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = InFlight::new();
        let guard = set.admit(&job());
        let outcome = run_job(handler, job(), ctx, guard, bus).await;

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        (outcome, events, set)
    }

    fn kinds(events: &[Event]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn success_publishes_completed_and_releases() {
        let h = HandlerFn::arc(|job: Job, _ctx: CancellationToken| async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok::<_, JobError>(JobReport { job, elapsed: Duration::from_secs(2) })
        });
        let (outcome, events, set) = run_with(h, CancellationToken::new()).await;

        assert!(matches!(outcome, JobOutcome::Completed(_)));
        assert_eq!(kinds(&events), vec![EventKind::JobStarting, EventKind::JobCompleted]);
        let ms = events[1].elapsed_ms.unwrap();
        assert!((2_000..=2_001).contains(&ms));
        assert_eq!(set.snapshot().completed, 1);
        assert_eq!(set.len(), 0);
    }

    #[tokio::test]
    async fn failure_is_reported_with_reason() {
        let h = HandlerFn::arc(|_job: Job, _ctx: CancellationToken| async move {
            Err::<JobReport, _>(JobError::fail("printer jammed"))
        });
        let (outcome, events, set) = run_with(h, CancellationToken::new()).await;

        assert_eq!(outcome, JobOutcome::Failed(JobError::fail("printer jammed")));
        assert_eq!(events[1].kind, EventKind::JobFailed);
        assert_eq!(events[1].reason.as_deref(), Some("execution failed: printer jammed"));
        assert_eq!(set.len(), 0);
    }

    #[tokio::test]
    async fn panic_becomes_failure() {
        let h = HandlerFn::arc(|_job: Job, _ctx: CancellationToken| async move {
            if true {
                panic!("toner exploded");
            }
            Err::<JobReport, _>(JobError::Interrupted)
        });
        let (outcome, events, set) = run_with(h, CancellationToken::new()).await;

        assert_eq!(
            outcome,
            JobOutcome::Failed(JobError::Panicked {
                reason: "toner exploded".into()
            })
        );
        assert_eq!(events[1].kind, EventKind::JobFailed);
        assert_eq!(set.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn token_stops_a_handler_that_ignores_it() {
        let h = HandlerFn::arc(|job: Job, _ctx: CancellationToken| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, JobError>(JobReport { job, elapsed: Duration::ZERO })
        });
        let ctx = CancellationToken::new();
        ctx.cancel();
        let (outcome, events, set) = run_with(h, ctx).await;

        assert_eq!(outcome, JobOutcome::Cancelled);
        assert_eq!(kinds(&events), vec![EventKind::JobStarting, EventKind::JobCancelled]);
        assert_eq!(set.len(), 0);
    }

    #[tokio::test]
    async fn interrupt_is_not_a_failure() {
        let h = HandlerFn::arc(|_job: Job, _ctx: CancellationToken| async move {
            Err::<JobReport, _>(JobError::Interrupted)
        });
        let (outcome, events, _) = run_with(h, CancellationToken::new()).await;

        assert_eq!(outcome, JobOutcome::Interrupted);
        assert_eq!(events[1].kind, EventKind::JobInterrupted);
    }

    #[tokio::test]
    async fn dropping_the_runner_still_releases() {
        let set = InFlight::new();
        let guard = set.admit(&job());
        let h = HandlerFn::arc(|job: Job, _ctx: CancellationToken| async move {
            std::future::pending::<()>().await;
            Ok::<_, JobError>(JobReport { job, elapsed: Duration::ZERO })
        });

        let task = tokio::spawn(run_job(h, job(), CancellationToken::new(), guard, Bus::new(4)));
        tokio::task::yield_now().await;
        assert_eq!(set.len(), 1);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(set.len(), 0);
        assert_eq!(set.snapshot().completed, 1);
    }
}
