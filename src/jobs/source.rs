//! # Job discovery with load-based admission.
//!
//! [`JobSource`] is asked by the dispatcher, on every poll, whether new work exists.
//! [`RandomJobSource`] simulates a work feed and throttles itself by the current
//! in-flight count:
//!
//! ```text
//! in_flight == 0                         ─► always a new job (no draw)
//! 0 < in_flight < max_in_flight
//!     draw ∈ [0, draw_max], draw % modulus == 0 ─► new job
//!     otherwise                               ─► none
//! in_flight >= max_in_flight             ─► none
//! ```
//!
//! With the defaults (`5`, `1000`, `17`) a loaded system admits roughly one job in
//! seventeen polls, while an idle one is never left without work.

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::core::SupervisorConfig;
use crate::error::DiscoveryError;
use crate::jobs::job::{Job, JobId};

/// Decides whether new work exists.
///
/// `discover` is synchronous and must not block: it is called from the dispatcher loop.
/// Returning an error never stops the dispatcher; it backs off and polls again.
pub trait JobSource: Send + Sync + 'static {
    /// Returns a new job, or `None` when there is nothing to do right now.
    ///
    /// `in_flight` is the number of handlers currently executing.
    fn discover(&self, in_flight: usize) -> Result<Option<Job>, DiscoveryError>;
}

impl<S: JobSource + ?Sized> JobSource for Arc<S> {
    fn discover(&self, in_flight: usize) -> Result<Option<Job>, DiscoveryError> {
        (**self).discover(in_flight)
    }
}

/// Randomized job feed with load-based admission.
///
/// Job ids are drawn from the same generator as the admission draws, so a source
/// built with [`RandomJobSource::with_seed`] produces the same sequence every time.
pub struct RandomJobSource {
    rng: Mutex<StdRng>,
    job_name: Arc<str>,
    max_in_flight: usize,
    draw_max: u32,
    modulus: u32,
}

impl RandomJobSource {
    /// Creates a source seeded from the operating system.
    pub fn new(cfg: &SupervisorConfig) -> Self {
        Self::with_rng(cfg, StdRng::from_os_rng())
    }

    /// Creates a reproducible source.
    pub fn with_seed(cfg: &SupervisorConfig, seed: u64) -> Self {
        Self::with_rng(cfg, StdRng::seed_from_u64(seed))
    }

    fn with_rng(cfg: &SupervisorConfig, rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            job_name: cfg.job_name.as_str().into(),
            max_in_flight: cfg.max_in_flight,
            draw_max: cfg.admission_draw_max,
            modulus: cfg.admission_modulus_clamped(),
        }
    }

    fn admits(&self, rng: &mut StdRng, in_flight: usize) -> bool {
        if in_flight == 0 {
            return true;
        }
        in_flight < self.max_in_flight && rng.random_range(0..=self.draw_max) % self.modulus == 0
    }
}

impl JobSource for RandomJobSource {
    fn discover(&self, in_flight: usize) -> Result<Option<Job>, DiscoveryError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.admits(&mut rng, in_flight) {
            return Ok(None);
        }

        let id = JobId::from_entropy(rng.random());
        debug!(job_id = %id, in_flight, "creating job");
        Ok(Some(Job::new(id, Arc::clone(&self.job_name))))
    }
}
