//! Run-scoped totals.

use std::sync::atomic::{AtomicU64, Ordering};

/// Totals for one run, updated once per completed blob task.
///
/// Blob tasks run on the multi-threaded runtime, so these are atomics
/// rather than plain fields behind cooperative scheduling.
#[derive(Debug, Default)]
pub struct RunCounters {
    blobs: AtomicU64,
    events: AtomicU64,
}

impl RunCounters {
    /// Record one completed blob and its sent events.
    ///
    /// Returns the new blob total, so the caller can emit periodic progress.
    pub fn record_blob(&self, events_sent: usize) -> u64 {
        self.events.fetch_add(events_sent as u64, Ordering::Relaxed);
        self.blobs.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Total blobs processed so far.
    pub fn blobs(&self) -> u64 {
        self.blobs.load(Ordering::Relaxed)
    }

    /// Total events sent so far.
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_and_returns_blob_total() {
        let counters = RunCounters::default();
        assert_eq!(counters.record_blob(5), 1);
        assert_eq!(counters.record_blob(0), 2);
        assert_eq!(counters.record_blob(7), 3);
        assert_eq!(counters.blobs(), 3);
        assert_eq!(counters.events(), 12);
    }
}
