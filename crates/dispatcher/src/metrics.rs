//! Per-sink counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Readings accepted
    processed_count: AtomicU64,
    /// Readings the sink failed to process
    failure_count: AtomicU64,
    /// Failed `finalise` calls
    finalise_failures: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed_count(&self) -> u64 {
        self.processed_count.load(Ordering::Relaxed)
    }

    pub fn inc_processed_count(&self) {
        self.processed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn finalise_failures(&self) -> u64 {
        self.finalise_failures.load(Ordering::Relaxed)
    }

    pub fn inc_finalise_failures(&self) {
        self.finalise_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed_count: self.processed_count(),
            failure_count: self.failure_count(),
            finalise_failures: self.finalise_failures(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub processed_count: u64,
    pub failure_count: u64,
    pub finalise_failures: u64,
}
