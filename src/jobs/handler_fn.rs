//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Job, CancellationToken) -> Fut`, producing a
//! fresh future per job. If the closure needs shared state, capture an `Arc<...>`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use jobvisor::{HandlerFn, HandlerRef, Job, JobError, JobReport};
//!
//! let h: HandlerRef = HandlerFn::arc(|job: Job, ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Err(JobError::Canceled);
//!     }
//!     Ok(JobReport { job, elapsed: Duration::ZERO })
//! });
//! # let _ = h;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::jobs::handler::{JobHandler, JobReport};
use crate::jobs::job::Job;

/// Function-backed handler implementation.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](crate::HandlerRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> JobHandler for HandlerFn<F>
where
    F: Fn(Job, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<JobReport, JobError>> + Send + 'static,
{
    async fn run(&self, job: Job, ctx: CancellationToken) -> Result<JobReport, JobError> {
        (self.f)(job, ctx).await
    }
}
