//! # In-flight ledger.
//!
//! Tracks the handlers that have started and not yet finished, together with
//! lifetime `started` / `completed` counters.
//!
//! ## Rules
//! - A job is **admitted before its handler is spawned**, so a fast handler can never
//!   finish before it is tracked.
//! - Admission returns an [`InFlightGuard`]; dropping it removes the entry **exactly once**,
//!   whether the handler completed, failed, panicked, was cancelled or was aborted.
//! - Entries are keyed by a slot number, not the job id, so duplicate ids cannot skew counts.
//! - Set and counters change under one lock: every [`InFlightSnapshot`] satisfies
//!   `in_flight == started - completed`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::jobs::{Job, JobId};

#[derive(Default)]
struct Ledger {
    jobs: HashMap<u64, JobId>,
    started: u64,
    completed: u64,
}

/// Point-in-time view of the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InFlightSnapshot {
    /// Handlers currently executing.
    pub in_flight: usize,
    /// Handlers admitted since the supervisor was built.
    pub started: u64,
    /// Handlers that reported completion (any outcome).
    pub completed: u64,
    /// Ids of the executing jobs, sorted.
    pub jobs: Vec<JobId>,
}

/// Shared set of executing handlers.
#[derive(Default)]
pub(crate) struct InFlight {
    ledger: Mutex<Ledger>,
}

impl InFlight {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a job that is about to start.
    pub(crate) fn admit(self: &Arc<Self>, job: &Job) -> InFlightGuard {
        let mut ledger = self.lock();
        let slot = ledger.started;
        ledger.started += 1;
        ledger.jobs.insert(slot, job.id().clone());
        InFlightGuard {
            set: Arc::clone(self),
            slot,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub(crate) fn snapshot(&self) -> InFlightSnapshot {
        let ledger = self.lock();
        let mut jobs: Vec<JobId> = ledger.jobs.values().cloned().collect();
        jobs.sort_unstable();
        InFlightSnapshot {
            in_flight: ledger.jobs.len(),
            started: ledger.started,
            completed: ledger.completed,
            jobs,
        }
    }

    fn release(&self, slot: u64) {
        let mut ledger = self.lock();
        if ledger.jobs.remove(&slot).is_some() {
            ledger.completed += 1;
        }
    }
}

/// Membership of one handler in the ledger; released on drop.
pub(crate) struct InFlightGuard {
    set: Arc<InFlight>,
    slot: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.release(self.slot);
    }
}
