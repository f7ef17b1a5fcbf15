//! In-memory partition index shared by the store adapters

use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use contracts::{BufferedEntry, EntryId, NewEntry};

/// Entries per output id, each partition in arrival order
#[derive(Debug)]
pub(crate) struct Partitions {
    entries: BTreeMap<String, VecDeque<BufferedEntry>>,
    next_id: EntryId,
}

impl Default for Partitions {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl Partitions {
    /// Rebuild an index from previously persisted entries
    pub(crate) fn restore(&mut self, output_id: &str, mut restored: Vec<BufferedEntry>) {
        restored.sort_by_key(|entry| entry.id);
        if let Some(last) = restored.last() {
            self.next_id = self.next_id.max(last.id + 1);
        }
        self.entries
            .entry(output_id.to_string())
            .or_default()
            .extend(restored);
    }

    pub(crate) fn push(&mut self, output_id: &str, entry: NewEntry) -> BufferedEntry {
        let entry = entry.with_id(self.next_id);
        self.next_id += 1;
        self.entries
            .entry(output_id.to_string())
            .or_default()
            .push_back(entry.clone());
        entry
    }

    pub(crate) fn oldest(&self, output_id: &str, limit: usize) -> Vec<BufferedEntry> {
        self.entries
            .get(output_id)
            .map(|queue| queue.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of entries removed
    pub(crate) fn remove_ids(&mut self, output_id: &str, ids: &[EntryId]) -> usize {
        let ids: HashSet<EntryId> = ids.iter().copied().collect();
        self.retain(output_id, |entry| !ids.contains(&entry.id))
    }

    /// Returns the number of entries removed
    pub(crate) fn remove_created_up_to(&mut self, output_id: &str, cutoff: DateTime<Utc>) -> usize {
        self.retain(output_id, |entry| entry.created_at > cutoff)
    }

    pub(crate) fn snapshot(&self, output_id: &str) -> VecDeque<BufferedEntry> {
        self.entries.get(output_id).cloned().unwrap_or_default()
    }

    pub(crate) fn replace(&mut self, output_id: &str, entries: VecDeque<BufferedEntry>) {
        self.entries.insert(output_id.to_string(), entries);
    }

    pub(crate) fn partition(&self, output_id: &str) -> impl Iterator<Item = &BufferedEntry> {
        self.entries.get(output_id).into_iter().flatten()
    }

    pub(crate) fn len(&self, output_id: &str) -> usize {
        self.entries.get(output_id).map_or(0, VecDeque::len)
    }

    fn retain(&mut self, output_id: &str, keep: impl Fn(&BufferedEntry) -> bool) -> usize {
        let Some(queue) = self.entries.get_mut(output_id) else {
            return 0;
        };
        let before = queue.len();
        queue.retain(|entry| keep(entry));
        before - queue.len()
    }
}
