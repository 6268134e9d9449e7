//! # Job handler abstraction and the built-in simulated handler.
//!
//! A [`JobHandler`] executes one [`Job`] to completion. It receives a
//! [`CancellationToken`] that is cancelled when the supervisor forcibly stops;
//! handlers should return [`JobError::Canceled`] promptly when it fires.
//!
//! [`SimulatedHandler`] stands in for real work: it sleeps for a random duration in
//! `[0, max_job_duration]` and reports how long it took.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::SupervisorConfig;
use crate::error::JobError;
use crate::jobs::job::Job;

/// Shared handle to a handler (`Arc<dyn JobHandler>`).
pub type HandlerRef = Arc<dyn JobHandler>;

/// Result of a successful job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobReport {
    /// The job that ran.
    pub job: Job,
    /// Time between handler start and completion.
    pub elapsed: Duration,
}

/// # Asynchronous, cancelable job executor.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use jobvisor::{Job, JobError, JobHandler, JobReport};
///
/// struct Noop;
///
/// #[async_trait]
/// impl JobHandler for Noop {
///     async fn run(&self, job: Job, ctx: CancellationToken) -> Result<JobReport, JobError> {
///         if ctx.is_cancelled() {
///             return Err(JobError::Canceled);
///         }
///         Ok(JobReport { job, elapsed: std::time::Duration::ZERO })
///     }
/// }
/// ```
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// Executes `job` until completion or cancellation.
    async fn run(&self, job: Job, ctx: CancellationToken) -> Result<JobReport, JobError>;
}

#[async_trait]
impl<H: JobHandler + ?Sized> JobHandler for Arc<H> {
    async fn run(&self, job: Job, ctx: CancellationToken) -> Result<JobReport, JobError> {
        (**self).run(job, ctx).await
    }
}

/// Handler that simulates variable-duration work.
pub struct SimulatedHandler {
    max_duration: Duration,
    rng: Mutex<StdRng>,
}

impl SimulatedHandler {
    pub fn new(cfg: &SupervisorConfig) -> Self {
        Self::with_rng(cfg.max_job_duration, StdRng::from_os_rng())
    }

    /// Creates a handler whose durations are reproducible.
    pub fn with_seed(cfg: &SupervisorConfig, seed: u64) -> Self {
        Self::with_rng(cfg.max_job_duration, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_duration: Duration, rng: StdRng) -> Self {
        Self {
            max_duration,
            rng: Mutex::new(rng),
        }
    }

    /// Draws the next simulated duration (millisecond granularity, inclusive bounds).
    pub fn next_duration(&self) -> Duration {
        let max_ms = u64::try_from(self.max_duration.as_millis()).unwrap_or(u64::MAX);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Duration::from_millis(rng.random_range(0..=max_ms))
    }
}

#[async_trait]
impl JobHandler for SimulatedHandler {
    async fn run(&self, job: Job, ctx: CancellationToken) -> Result<JobReport, JobError> {
        let work = self.next_duration();
        info!(job_id = %job.id(), planned_ms = work.as_millis() as u64, "processing job: {job}");

        let start = Instant::now();
        tokio::select! {
            _ = ctx.cancelled() => return Err(JobError::Canceled),
            _ = time::sleep(work) => {}
        }
        let elapsed = start.elapsed();

        info!(
            job_id = %job.id(),
            elapsed_ms = elapsed.as_millis() as u64,
            "job finished successfully in {elapsed:?}: {job}"
        );
        Ok(JobReport { job, elapsed })
    }
}
