//! Built-in filters

use std::collections::HashSet;
use std::sync::Arc;

use contracts::{Clock, Document, FilterOutcome, LogFilter, SystemClock};
use serde_json::Value;

/// Adds the current time, in milliseconds since the epoch
pub struct AddTimeFilter {
    key: String,
    clock: Arc<dyn Clock>,
}

impl AddTimeFilter {
    /// Stamp under `"time"` using the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Stamp using `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            key: "time".to_string(),
            clock,
        }
    }

    /// Use a different key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

impl Default for AddTimeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogFilter for AddTimeFilter {
    fn apply(&self, mut log: Document) -> FilterOutcome {
        let millis = self.clock.now().timestamp_millis();
        log.insert(self.key.clone(), Value::from(millis));
        FilterOutcome::Keep(log)
    }
}

/// Removes the listed keys
#[derive(Debug, Clone)]
pub struct RemoveKeysFilter {
    keys: HashSet<String>,
}

impl RemoveKeysFilter {
    /// Remove every key in `keys`; missing keys are ignored
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl LogFilter for RemoveKeysFilter {
    fn apply(&self, mut log: Document) -> FilterOutcome {
        // retain keeps the order of the remaining keys
        log.retain(|key, _| !self.keys.contains(key));
        FilterOutcome::Keep(log)
    }
}

/// Skips logs unless `key` is present and equal to `value`
#[derive(Debug, Clone)]
pub struct KeepIfFilter {
    key: String,
    value: Value,
}

impl KeepIfFilter {
    /// Keep only logs whose `key` equals `value`
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl LogFilter for KeepIfFilter {
    fn apply(&self, log: Document) -> FilterOutcome {
        if log.get(&self.key) == Some(&self.value) {
            FilterOutcome::Keep(log)
        } else {
            FilterOutcome::Skip
        }
    }
}
