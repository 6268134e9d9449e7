//! Jobs: the unit of work, where it comes from, and what executes it.
//!
//! - [`Job`] / [`JobId`] immutable work item;
//! - [`JobSource`] / [`RandomJobSource`] discovery with load-based admission;
//! - [`JobHandler`] / [`SimulatedHandler`] / [`HandlerFn`] execution;
//! - [`JobOutcome`] tagged terminal state inspected by the completion hook.

mod handler;
mod handler_fn;
mod job;
mod outcome;
mod source;

pub use handler::{HandlerRef, JobHandler, JobReport, SimulatedHandler};
pub use handler_fn::HandlerFn;
pub use job::{JOB_ID_ENTROPY, Job, JobId};
pub use outcome::JobOutcome;
pub use source::{JobSource, RandomJobSource};
