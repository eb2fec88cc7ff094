//! Soft-deadline guard.
//!
//! The invocation host enforces a hard execution timeout; the pipeline stops
//! admitting new blobs well before it. In-flight work is never cancelled, so
//! the soft limit must leave enough margin for the largest admitted page to
//! finish.

use std::time::{Duration, Instant};

/// Run start time plus the in-process time budget.
///
/// Read-only after initialization; only the elapsed comparison runs per
/// admission.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineState {
    started: Instant,
    soft_limit: Duration,
}

impl DeadlineState {
    /// Start the clock now with the given soft limit.
    pub fn start(soft_limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            soft_limit,
        }
    }

    /// Whether the elapsed run time exceeds the soft limit.
    pub fn exceeded(&self) -> bool {
        self.started.elapsed() > self.soft_limit
    }
}
