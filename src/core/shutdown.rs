//! # Once-only shutdown flag with a captured start instant.
//!
//! The flag is read by the dispatcher on every poll and awaited by its idle waits.
//! It flips `false → true` at most once per supervisor and is never reset; the
//! instant of that flip bounds the grace period.

use std::sync::OnceLock;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub(crate) struct ShutdownFlag {
    token: CancellationToken,
    started_at: OnceLock<Instant>,
}

impl ShutdownFlag {
    /// Sets the flag. Returns the start instant and whether this call set it.
    pub(crate) fn trigger(&self) -> (Instant, bool) {
        let mut first = false;
        let at = *self.started_at.get_or_init(|| {
            first = true;
            Instant::now()
        });
        self.token.cancel();
        (at, first)
    }

    pub(crate) fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the flag is set.
    pub(crate) async fn wait(&self) {
        self.token.cancelled().await
    }

    /// Deadline for natural termination, if shutdown has started.
    pub(crate) fn deadline(&self, grace: Duration) -> Option<Instant> {
        self.started_at.get().map(|at| *at + grace)
    }
}
