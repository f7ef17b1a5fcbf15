//! Buffered output state machine
//!
//! `Idle -> Waiting -> Flushing -> Idle`. The worker owns the timer (Waiting)
//! and the completion channel; this module owns the schedule arithmetic,
//! batch assembly and the store mutations of one output.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{
    BufferedEntry, BufferedOutputConfig, BufferedSink, ContractError, Document, EntryId,
    LogStore, NewEntry, OutputSchedule,
};
use observability::FlushStatus;
use tracing::{debug, error, info, warn};

use crate::metrics::OutputMetrics;

/// A batch sink plus its identity and tunables
///
/// The id names the store partition; changing it orphans entries buffered
/// under the old id.
#[derive(Clone)]
pub struct BufferedOutput {
    id: String,
    config: BufferedOutputConfig,
    sink: Arc<dyn BufferedSink>,
}

impl BufferedOutput {
    /// Create an output with default tunables
    pub fn new(id: impl Into<String>, sink: impl BufferedSink + 'static) -> Self {
        Self::from_arc(id, Arc::new(sink))
    }

    /// Create an output around a shared sink
    pub fn from_arc(id: impl Into<String>, sink: Arc<dyn BufferedSink>) -> Self {
        Self {
            id: id.into(),
            config: BufferedOutputConfig::default(),
            sink,
        }
    }

    /// Replace the tunables
    pub fn with_config(mut self, config: BufferedOutputConfig) -> Self {
        self.config = config;
        self
    }

    /// Output id (store partition key)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tunables
    pub fn config(&self) -> &BufferedOutputConfig {
        &self.config
    }

    /// Underlying sink
    pub fn sink(&self) -> &Arc<dyn BufferedSink> {
        &self.sink
    }

    /// Same id, same sink instance and same tunables
    pub(crate) fn is_same_instance(&self, other: &BufferedOutput) -> bool {
        self.id == other.id
            && std::ptr::addr_eq(Arc::as_ptr(&self.sink), Arc::as_ptr(&other.sink))
            && self.config == other.config
    }
}

impl std::fmt::Debug for BufferedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedOutput")
            .field("id", &self.id)
            .field("sink", &self.sink.name())
            .field("config", &self.config)
            .finish()
    }
}

/// What a flush cycle asks the worker to do
#[derive(Debug)]
pub(crate) enum FlushPlan {
    /// A previous attempt is still waiting for its completion
    InFlight,
    /// Nothing to send; scheduled as a success
    Empty,
    /// A store operation failed; cycle abandoned
    Aborted,
    /// Hand `logs` to the sink and report back with `attempt`
    Emit { attempt: u64, logs: Vec<Document> },
}

#[derive(Debug)]
enum Phase {
    Idle,
    Flushing { attempt: u64, ids: Vec<EntryId> },
}

/// Runtime state of one buffered output, owned by the router worker
pub(crate) struct OutputState {
    output: BufferedOutput,
    schedule: OutputSchedule,
    phase: Phase,
    attempts: u64,
    metrics: Arc<OutputMetrics>,
}

impl OutputState {
    /// First flush is due one interval after `now`
    pub(crate) fn new(output: BufferedOutput, now: DateTime<Utc>) -> Self {
        let schedule = OutputSchedule::starting_at(add(now, output.config.flush_interval));
        Self {
            output,
            schedule,
            phase: Phase::Idle,
            attempts: 0,
            metrics: Arc::new(OutputMetrics::new()),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.output.id
    }

    pub(crate) fn sink(&self) -> &Arc<dyn BufferedSink> {
        &self.output.sink
    }

    pub(crate) fn schedule(&self) -> OutputSchedule {
        self.schedule
    }

    pub(crate) fn metrics(&self) -> &Arc<OutputMetrics> {
        &self.metrics
    }

    pub(crate) fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// Persist a dispatched log
    pub(crate) fn enqueue(&self, store: &mut dyn LogStore, log: Document, now: DateTime<Utc>) {
        let entry = NewEntry {
            created_at: now,
            log,
        };
        match store.append(self.id(), entry) {
            Ok(id) => {
                self.metrics.inc_enqueued_count();
                observability::record_log_enqueued(self.id());
                debug!(output = %self.id(), entry_id = id, "Log buffered");
            }
            Err(e) => self.store_failed("append", &e),
        }
    }

    /// Purge, fetch and trim; moves to `Flushing` when there is a batch
    pub(crate) fn begin_flush(&mut self, store: &mut dyn LogStore, now: DateTime<Utc>) -> FlushPlan {
        if !self.is_idle() {
            return FlushPlan::InFlight;
        }

        if let Some(age) = self.output.config.purgeable_age {
            match store.delete_older_than(self.id(), sub(now, age)) {
                Ok(purged) => {
                    if purged > 0 {
                        self.metrics.add_purged_count(purged);
                        observability::record_logs_purged(self.id(), purged);
                        info!(output = %self.id(), purged, "Purged expired logs");
                    }
                }
                Err(e) => {
                    self.store_failed("purge", &e);
                    self.schedule_normal_cadence(now);
                    return FlushPlan::Aborted;
                }
            }
        }

        let entries = match store.fetch(self.id(), self.output.config.logs_per_flush) {
            Ok(entries) => entries,
            Err(e) => {
                self.store_failed("fetch", &e);
                self.schedule_normal_cadence(now);
                return FlushPlan::Aborted;
            }
        };
        let fetched = entries.len();
        let batch = take_within_size(entries, self.output.config.max_flush_size_in_bytes);

        if batch.is_empty() {
            if fetched > 0 {
                warn!(
                    output = %self.id(),
                    fetched,
                    limit = ?self.output.config.max_flush_size_in_bytes,
                    "Oldest log exceeds max_flush_size_in_bytes, nothing flushed"
                );
            }
            observability::record_flush(self.id(), FlushStatus::Empty, 0);
            self.on_success(now);
            return FlushPlan::Empty;
        }

        self.attempts += 1;
        let attempt = self.attempts;
        let (ids, logs) = batch.into_iter().map(|entry| (entry.id, entry.log)).unzip();
        self.phase = Phase::Flushing { attempt, ids };
        FlushPlan::Emit { attempt, logs }
    }

    /// Apply the sink's outcome for `attempt`
    pub(crate) fn finish_flush(
        &mut self,
        store: &mut dyn LogStore,
        attempt: u64,
        outcome: Result<(), ContractError>,
        now: DateTime<Utc>,
    ) {
        let ids = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Flushing {
                attempt: current,
                ids,
            } if current == attempt => ids,
            phase => {
                warn!(output = %self.id(), attempt, "Ignoring completion of unknown flush attempt");
                self.phase = phase;
                return;
            }
        };

        match outcome {
            Ok(()) => {
                self.on_success(now);
                self.metrics.add_flushed_count(ids.len());
                observability::record_flush(self.id(), FlushStatus::Success, ids.len());
                debug!(output = %self.id(), logs = ids.len(), "Flush succeeded");
                if let Err(e) = store.delete_by_ids(self.id(), &ids) {
                    // entries stay buffered and will be delivered again
                    self.store_failed("delete", &e);
                }
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                observability::record_flush(self.id(), FlushStatus::Failure, ids.len());
                error!(output = %self.id(), error = %e, "Error emitting buffered logs");
                self.on_failure(now);
            }
        }
    }

    fn on_success(&mut self, now: DateTime<Utc>) {
        self.schedule.retry_count = 0;
        self.schedule_normal_cadence(now);
    }

    fn on_failure(&mut self, now: DateTime<Utc>) {
        let config = &self.output.config;
        self.schedule.retry_count += 1;
        if self.schedule.retry_count > config.max_retry_count {
            // keep the batch; it is fetched again on the next regular cycle
            self.schedule.retry_count = 0;
            self.schedule.next_flush_at = add(now, config.flush_interval);
            self.metrics.inc_exhausted_count();
            observability::record_backoff_exhausted(self.id());
            warn!(
                output = %self.id(),
                max_retry_count = config.max_retry_count,
                "Retries exhausted, reverting to flush interval"
            );
        } else {
            let delay = backoff_delay(config.exponential_backoff_base, self.schedule.retry_count);
            self.schedule.next_flush_at = add(now, delay);
            debug!(
                output = %self.id(),
                retry_count = self.schedule.retry_count,
                delay_ms = delay.as_millis() as u64,
                "Retrying with backoff"
            );
        }
    }

    fn schedule_normal_cadence(&mut self, now: DateTime<Utc>) {
        self.schedule.next_flush_at = add(now, self.output.config.flush_interval);
    }

    fn store_failed(&self, operation: &'static str, e: &ContractError) {
        self.metrics.inc_store_failure_count();
        observability::record_store_failure(self.id(), operation);
        error!(output = %self.id(), operation, error = %e, "Store operation failed");
    }
}

/// `base * 2^(retry_count - 1)`, saturating
pub(crate) fn backoff_delay(base: Duration, retry_count: u32) -> Duration {
    let factor = 2u32
        .checked_pow(retry_count.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(Duration::MAX)
}

/// Longest prefix whose cumulative serialized size stays within `limit`
pub(crate) fn take_within_size(
    entries: Vec<BufferedEntry>,
    limit: Option<u64>,
) -> Vec<BufferedEntry> {
    let Some(limit) = limit else {
        return entries;
    };
    let mut total = 0u64;
    entries
        .into_iter()
        .take_while(|entry| {
            total = total.saturating_add(entry.serialized_len());
            total <= limit
        })
        .collect()
}

fn add(at: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| at.checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn sub(at: DateTime<Utc>, age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| at.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contracts::FlushCompletion;
    use log_store::MemoryLogStore;
    use serde_json::json;

    struct NullSink;

    impl BufferedSink for NullSink {
        fn name(&self) -> &str {
            "null"
        }

        fn emit(&self, _logs: Vec<Document>, completion: FlushCompletion) {
            completion.succeed();
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn log(seq: u64) -> Document {
        let mut log = Document::new();
        log.insert("sequence".to_string(), json!(seq));
        log
    }

    fn state(config: BufferedOutputConfig) -> OutputState {
        OutputState::new(BufferedOutput::new("out", NullSink).with_config(config), t0())
    }

    fn sequences(logs: &[Document]) -> Vec<u64> {
        logs.iter()
            .map(|log| log["sequence"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn test_initial_schedule() {
        let state = state(BufferedOutputConfig::default());
        assert_eq!(state.schedule().next_flush_at, add(t0(), secs(120)));
        assert_eq!(state.schedule().retry_count, 0);
    }

    #[test]
    fn test_flush_success_deletes_batch_and_resets_schedule() {
        let mut store = MemoryLogStore::new();
        let mut state = state(BufferedOutputConfig::default());
        state.enqueue(&mut store, log(1), t0());
        state.enqueue(&mut store, log(2), t0());

        let now = add(t0(), secs(120));
        let FlushPlan::Emit { attempt, logs } = state.begin_flush(&mut store, now) else {
            panic!("expected a batch");
        };
        assert_eq!(sequences(&logs), vec![1, 2]);
        assert!(matches!(state.begin_flush(&mut store, now), FlushPlan::InFlight));

        state.finish_flush(&mut store, attempt, Ok(()), now);
        assert!(store.is_empty("out"));
        assert_eq!(state.schedule().next_flush_at, add(now, secs(120)));
        assert_eq!(state.metrics().flushed_count(), 2);
    }

    #[test]
    fn test_batch_is_limited_by_logs_per_flush() {
        let mut store = MemoryLogStore::new();
        let mut state = state(BufferedOutputConfig::default().with_logs_per_flush(2));
        for seq in 1..=3 {
            state.enqueue(&mut store, log(seq), t0());
        }

        let FlushPlan::Emit { attempt, logs } = state.begin_flush(&mut store, t0()) else {
            panic!("expected a batch");
        };
        assert_eq!(sequences(&logs), vec![1, 2]);
        state.finish_flush(&mut store, attempt, Ok(()), t0());
        assert_eq!(store.len("out"), 1);
    }

    #[test]
    fn test_empty_flush_counts_as_success() {
        let mut store = MemoryLogStore::new();
        let mut state = state(BufferedOutputConfig::default());
        state.schedule.retry_count = 3;

        assert!(matches!(state.begin_flush(&mut store, t0()), FlushPlan::Empty));
        assert_eq!(state.schedule().retry_count, 0);
        assert_eq!(state.schedule().next_flush_at, add(t0(), secs(120)));
        assert!(state.is_idle());
    }

    #[test]
    fn test_backoff_sequence_then_revert_to_interval() {
        let mut store = MemoryLogStore::new();
        let mut state = state(BufferedOutputConfig::default());
        state.enqueue(&mut store, log(1), t0());

        let mut now = t0();
        for retry in 1..=5u32 {
            let FlushPlan::Emit { attempt, logs } = state.begin_flush(&mut store, now) else {
                panic!("expected a batch");
            };
            assert_eq!(sequences(&logs), vec![1]);
            state.finish_flush(
                &mut store,
                attempt,
                Err(ContractError::sink_write("null", "offline")),
                now,
            );
            let expected = secs(2) * 2u32.pow(retry - 1);
            assert_eq!(state.schedule().retry_count, retry);
            assert_eq!(state.schedule().next_flush_at, add(now, expected));
            now = state.schedule().next_flush_at;
        }

        // sixth consecutive failure exceeds max_retry_count
        let FlushPlan::Emit { attempt, .. } = state.begin_flush(&mut store, now) else {
            panic!("expected a batch");
        };
        state.finish_flush(
            &mut store,
            attempt,
            Err(ContractError::sink_write("null", "offline")),
            now,
        );
        assert_eq!(state.schedule().retry_count, 0);
        assert_eq!(state.schedule().next_flush_at, add(now, secs(120)));
        assert_eq!(state.metrics().exhausted_count(), 1);

        // the batch is kept for the next regular cycle
        assert_eq!(store.len("out"), 1);
    }

    #[test]
    fn test_purge_runs_before_fetch() {
        let mut store = MemoryLogStore::new();
        let mut state = state(BufferedOutputConfig::default().with_purgeable_age(secs(20)));
        state.enqueue(&mut store, log(1), t0());
        state.enqueue(&mut store, log(2), add(t0(), secs(15)));

        // entry 1 is exactly 20s old and is purged; entry 2 survives
        let now = add(t0(), secs(20));
        let FlushPlan::Emit { logs, .. } = state.begin_flush(&mut store, now) else {
            panic!("expected a batch");
        };
        assert_eq!(sequences(&logs), vec![2]);
        assert_eq!(state.metrics().purged_count(), 1);
    }

    #[test]
    fn test_take_within_size() {
        let entries: Vec<BufferedEntry> = (1..=3)
            .map(|seq| NewEntry {
                created_at: t0(),
                log: log(seq),
            })
            .zip(1..)
            .map(|(entry, id)| entry.with_id(id))
            .collect();
        // {"sequence":1} is 14 bytes
        let s1 = entries[0].serialized_len();
        assert_eq!(s1, 14);

        assert_eq!(take_within_size(entries.clone(), Some(s1)).len(), 1);
        assert_eq!(take_within_size(entries.clone(), Some(s1 * 2)).len(), 2);
        assert!(take_within_size(entries.clone(), Some(s1 - 1)).is_empty());
        assert_eq!(take_within_size(entries, None).len(), 3);
    }

    #[test]
    fn test_oversized_oldest_entry_yields_empty_cycle() {
        let mut store = MemoryLogStore::new();
        let mut state = state(BufferedOutputConfig::default().with_max_flush_size_in_bytes(4));
        state.enqueue(&mut store, log(1), t0());

        assert!(matches!(state.begin_flush(&mut store, t0()), FlushPlan::Empty));
        assert_eq!(store.len("out"), 1);
    }

    #[test]
    fn test_backoff_delay_saturates() {
        assert_eq!(backoff_delay(secs(2), 1), secs(2));
        assert_eq!(backoff_delay(secs(2), 4), secs(16));
        assert_eq!(backoff_delay(secs(2), 200), Duration::MAX);
    }
}
