//! # Dispatcher lifecycle state.
//!
//! ```text
//! Idle ──start()──► Running ──flag observed──► Draining ──handlers done──► Terminated
//!                      └───────────forced cancellation──────────────────────┘
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of the supervisor's dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    /// Built, not started.
    Idle,
    /// Polling the source and launching handlers.
    Running,
    /// Shutdown observed; waiting for in-flight handlers.
    Draining,
    /// Dispatcher loop returned.
    Terminated,
}

impl SupervisorState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SupervisorState::Idle,
            1 => SupervisorState::Running,
            2 => SupervisorState::Draining,
            _ => SupervisorState::Terminated,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SupervisorState::Idle as u8))
    }

    pub(crate) fn get(&self) -> SupervisorState {
        SupervisorState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: SupervisorState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
