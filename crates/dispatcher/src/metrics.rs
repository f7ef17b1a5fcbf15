//! Buffered output metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single buffered output
///
/// Written by the router worker, readable from any [`crate::Router`] handle.
#[derive(Debug, Default)]
pub struct OutputMetrics {
    /// Logs appended to the store
    enqueued_count: AtomicU64,
    /// Logs delivered by successful flushes
    flushed_count: AtomicU64,
    /// Flush attempts the sink reported as failed
    failure_count: AtomicU64,
    /// Backoff streaks that ran past max_retry_count
    exhausted_count: AtomicU64,
    /// Logs deleted by age
    purged_count: AtomicU64,
    /// Failed store operations
    store_failure_count: AtomicU64,
}

impl OutputMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get enqueued count
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued_count.load(Ordering::Relaxed)
    }

    /// Increment enqueued count
    pub fn inc_enqueued_count(&self) {
        self.enqueued_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get flushed count
    pub fn flushed_count(&self) -> u64 {
        self.flushed_count.load(Ordering::Relaxed)
    }

    /// Add delivered logs
    pub fn add_flushed_count(&self, logs: usize) {
        self.flushed_count.fetch_add(logs as u64, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get exhausted streak count
    pub fn exhausted_count(&self) -> u64 {
        self.exhausted_count.load(Ordering::Relaxed)
    }

    /// Increment exhausted streak count
    pub fn inc_exhausted_count(&self) {
        self.exhausted_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get purged count
    pub fn purged_count(&self) -> u64 {
        self.purged_count.load(Ordering::Relaxed)
    }

    /// Add purged logs
    pub fn add_purged_count(&self, logs: usize) {
        self.purged_count.fetch_add(logs as u64, Ordering::Relaxed);
    }

    /// Get store failure count
    pub fn store_failure_count(&self) -> u64 {
        self.store_failure_count.load(Ordering::Relaxed)
    }

    /// Increment store failure count
    pub fn inc_store_failure_count(&self) {
        self.store_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enqueued_count: self.enqueued_count(),
            flushed_count: self.flushed_count(),
            failure_count: self.failure_count(),
            exhausted_count: self.exhausted_count(),
            purged_count: self.purged_count(),
            store_failure_count: self.store_failure_count(),
        }
    }
}

/// Snapshot of output metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub enqueued_count: u64,
    pub flushed_count: u64,
    pub failure_count: u64,
    pub exhausted_count: u64,
    pub purged_count: u64,
    pub store_failure_count: u64,
}
