//! Error types used by the jobvisor runtime, job sources and job handlers.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: lifecycle misuse of the [`Supervisor`](crate::Supervisor).
//! - [`JobError`]: outcomes of a single handler invocation other than success.
//! - [`DiscoveryError`]: failures while asking a [`JobSource`](crate::JobSource) for work.
//!
//! All of them provide `as_label` for logs. [`JobError`] also separates real
//! failures from control signals via [`JobError::is_control`].

use thiserror::Error;

/// # Errors produced by the supervisor lifecycle.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// `start()` was called while the dispatcher is already running.
    #[error("supervisor already started")]
    AlreadyStarted,

    /// `start()` was called after shutdown began.
    #[error("supervisor is shutting down")]
    ShuttingDown,

    /// `stop()` was called but there is no dispatcher to stop.
    #[error("supervisor is not running")]
    NotRunning,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use jobvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::NotRunning.as_label(), "runtime_not_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyStarted => "runtime_already_started",
            RuntimeError::ShuttingDown => "runtime_shutting_down",
            RuntimeError::NotRunning => "runtime_not_running",
        }
    }
}

/// # Errors produced by a job handler invocation.
///
/// `Fail` and `Panicked` are failures. `Canceled` and `Interrupted` are control
/// signals: they end the job early but are never reported as failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Job execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler panicked; the panic was caught by the runner.
    #[error("handler panicked: {reason}")]
    Panicked {
        /// Panic payload rendered as text.
        reason: String,
    },

    /// Job was cancelled through its cancellation token.
    #[error("context cancelled")]
    Canceled,

    /// Handler noticed an in-progress shutdown and stopped early.
    ///
    /// Reserved for cooperative handlers; the built-in handlers never return it.
    #[error("interrupted by shutdown")]
    Interrupted,
}

impl JobError {
    /// Shorthand for [`JobError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        JobError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use jobvisor::JobError;
    ///
    /// assert_eq!(JobError::fail("boom").as_label(), "job_failed");
    /// assert_eq!(JobError::Canceled.as_label(), "job_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Panicked { .. } => "job_panicked",
            JobError::Canceled => "job_canceled",
            JobError::Interrupted => "job_interrupted",
        }
    }

    /// Returns `true` for cancellation and shutdown interrupts.
    ///
    /// Control signals are expected terminal outcomes and are not logged as errors.
    pub fn is_control(&self) -> bool {
        matches!(self, JobError::Canceled | JobError::Interrupted)
    }
}

/// # Errors produced while discovering work.
///
/// Always recovered by the dispatcher loop: it backs off and polls again.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The source could not decide whether work exists.
    #[error("discovery failed: {error}")]
    Source {
        /// The underlying error message.
        error: String,
    },

    /// The source panicked; the panic was caught by the dispatcher.
    #[error("discovery panicked: {reason}")]
    Panicked {
        /// Panic payload rendered as text.
        reason: String,
    },
}

impl DiscoveryError {
    /// Shorthand for [`DiscoveryError::Source`].
    pub fn source(error: impl Into<String>) -> Self {
        DiscoveryError::Source {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DiscoveryError::Source { .. } => "discovery_failed",
            DiscoveryError::Panicked { .. } => "discovery_panicked",
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
