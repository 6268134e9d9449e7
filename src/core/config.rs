//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for the dispatcher, the built-in
//! source and handler, and the shutdown coordinator.
//!
//! ## Sentinel values
//! - `admission_modulus = 0` → treated as `1` (every draw admits)
//! - `bus_capacity = 0` → treated as `1`
//! - `grace = 0s` → forced cancellation right after the shutdown flag is set

use std::time::Duration;

/// Default label stamped on every job produced by [`RandomJobSource`](crate::RandomJobSource).
pub const DEFAULT_JOB_NAME: &str = "Simulated print job";

/// Configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `poll_interval`: idle wait when the source had nothing
/// - `error_backoff`: wait after a discovery error
/// - `grace`: maximum wait for natural termination during shutdown
/// - `max_in_flight`, `admission_modulus`, `admission_draw_max`: admission control
/// - `max_job_duration`: upper bound of simulated work
/// - `job_name`: label of generated jobs
/// - `bus_capacity`: event ring buffer size
///
/// All fields are public; tests shrink the durations instead of waiting on real timers.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Wait before polling again when no job was discovered.
    pub poll_interval: Duration,

    /// Wait before polling again after a discovery error.
    pub error_backoff: Duration,

    /// Maximum time `stop()` waits for the dispatcher to drain before cancelling it.
    pub grace: Duration,

    /// Random admission is closed once this many handlers are in flight.
    pub max_in_flight: usize,

    /// A loaded system admits a job when `draw % admission_modulus == 0`.
    pub admission_modulus: u32,

    /// Inclusive upper bound of the admission draw.
    pub admission_draw_max: u32,

    /// Simulated jobs sleep for a random duration in `[0, max_job_duration]`.
    pub max_job_duration: Duration,

    /// Descriptive label of generated jobs.
    pub job_name: String,

    /// Capacity of the event bus ring buffer.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Returns the admission modulus clamped to a minimum of 1.
    #[inline]
    pub fn admission_modulus_clamped(&self) -> u32 {
        self.admission_modulus.max(1)
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Probability that a single poll of a loaded (but not full) system yields a job.
    ///
    /// # Example
    /// ```
    /// use jobvisor::SupervisorConfig;
    ///
    /// let p = SupervisorConfig::default().admission_probability();
    /// assert!((p - 59.0 / 1001.0).abs() < 1e-12);
    /// ```
    pub fn admission_probability(&self) -> f64 {
        let m = u64::from(self.admission_modulus_clamped());
        let draws = u64::from(self.admission_draw_max) + 1;
        let hits = u64::from(self.admission_draw_max) / m + 1;
        hits as f64 / draws as f64
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `poll_interval = 1s`, `error_backoff = 5s`, `grace = 15s`
    /// - `max_in_flight = 5`, `admission_modulus = 17`, `admission_draw_max = 1000`
    /// - `max_job_duration = 120s`
    /// - `job_name = "Simulated print job"`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
            grace: Duration::from_secs(15),
            max_in_flight: 5,
            admission_modulus: 17,
            admission_draw_max: 1000,
            max_job_duration: Duration::from_secs(120),
            job_name: DEFAULT_JOB_NAME.to_string(),
            bus_capacity: 1024,
        }
    }
}
