//! Buffered output tunables and schedule state

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Tunables of one buffered output, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedOutputConfig {
    /// Normal cadence between flushes
    pub flush_interval: Duration,

    /// Maximum number of logs in a batch
    pub logs_per_flush: usize,

    /// Failed attempts retried with backoff before reverting to normal cadence
    pub max_retry_count: u32,

    /// First backoff delay; doubles on each consecutive failure
    pub exponential_backoff_base: Duration,

    /// Logs at least this old are deleted before a batch is assembled
    pub purgeable_age: Option<Duration>,

    /// Maximum cumulative serialized size of a batch (None = unbounded)
    pub max_flush_size_in_bytes: Option<u64>,
}

impl Default for BufferedOutputConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(120),
            logs_per_flush: 100,
            max_retry_count: 5,
            exponential_backoff_base: Duration::from_secs(2),
            purgeable_age: None,
            max_flush_size_in_bytes: None,
        }
    }
}

impl BufferedOutputConfig {
    /// Set the flush interval
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the batch size limit
    pub fn with_logs_per_flush(mut self, logs: usize) -> Self {
        self.logs_per_flush = logs;
        self
    }

    /// Set the retry limit
    pub fn with_max_retry_count(mut self, count: u32) -> Self {
        self.max_retry_count = count;
        self
    }

    /// Set the backoff base
    pub fn with_exponential_backoff_base(mut self, base: Duration) -> Self {
        self.exponential_backoff_base = base;
        self
    }

    /// Enable age-based purging
    pub fn with_purgeable_age(mut self, age: Duration) -> Self {
        self.purgeable_age = Some(age);
        self
    }

    /// Limit batches by serialized size
    pub fn with_max_flush_size_in_bytes(mut self, bytes: u64) -> Self {
        self.max_flush_size_in_bytes = Some(bytes);
        self
    }
}

/// Mutable schedule of one buffered output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSchedule {
    /// When the next timer-driven flush is due
    pub next_flush_at: DateTime<Utc>,

    /// Consecutive failures in the current backoff streak
    pub retry_count: u32,
}

impl OutputSchedule {
    /// Schedule whose first flush is due at `next_flush_at`
    pub fn starting_at(next_flush_at: DateTime<Utc>) -> Self {
        Self {
            next_flush_at,
            retry_count: 0,
        }
    }

    /// Whether the flush is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_flush_at <= now
    }
}
