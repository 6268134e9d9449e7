//! # Tagged result of one handler invocation.
//!
//! The completion hook inspects a [`JobOutcome`] instead of matching on error types:
//!
//! ```text
//! Ok(report)                 ─► Completed(report)
//! Err(Canceled)  / token     ─► Cancelled      (expected, not an error)
//! Err(Interrupted)           ─► Interrupted    (expected, not an error)
//! Err(Fail) / panic          ─► Failed(error)  (logged with job identity)
//! ```

use crate::error::JobError;
use crate::jobs::handler::JobReport;

/// Terminal state of a job handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// Handler finished normally.
    Completed(JobReport),
    /// Handler failed or panicked.
    Failed(JobError),
    /// Handler stopped because its cancellation token fired.
    Cancelled,
    /// Handler stopped early after noticing a shutdown.
    Interrupted,
}

impl JobOutcome {
    /// Short label for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobOutcome::Completed(_) => "completed",
            JobOutcome::Failed(_) => "failed",
            JobOutcome::Cancelled => "cancelled",
            JobOutcome::Interrupted => "interrupted",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }
}

impl From<Result<JobReport, JobError>> for JobOutcome {
    fn from(res: Result<JobReport, JobError>) -> Self {
        match res {
            Ok(report) => JobOutcome::Completed(report),
            Err(JobError::Canceled) => JobOutcome::Cancelled,
            Err(JobError::Interrupted) => JobOutcome::Interrupted,
            Err(e) => JobOutcome::Failed(e),
        }
    }
}
