//! Runtime core: dispatching and lifecycle.
//!
//! The public API from this module is [`Supervisor`] (with its builder, config and
//! state types). Internal modules:
//! - [`dispatcher`]: the poll loop; owns the handler task group;
//! - [`runner`]: runs one handler and its completion hook;
//! - [`in_flight`]: ledger of executing handlers with drop-guard release;
//! - [`shutdown`]: once-only shutdown flag and grace deadline;
//! - [`signal`]: host termination signals;
//! - [`supervisor`]: lifecycle hooks and the shutdown coordinator.

mod builder;
mod config;
mod dispatcher;
mod in_flight;
mod runner;
mod shutdown;
mod signal;
mod state;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{DEFAULT_JOB_NAME, SupervisorConfig};
pub use in_flight::InFlightSnapshot;
pub use state::SupervisorState;
pub use supervisor::{ShutdownReport, Supervisor};
