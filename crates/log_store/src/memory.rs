//! MemoryLogStore - volatile store

use chrono::{DateTime, Utc};
use contracts::{BufferedEntry, ContractError, EntryId, LogStore, NewEntry};

use crate::partitions::Partitions;

/// Store that keeps every partition in memory
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    partitions: Partitions,
}

impl MemoryLogStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries buffered for an output
    pub fn len(&self, output_id: &str) -> usize {
        self.partitions.len(output_id)
    }

    /// Whether an output has nothing buffered
    pub fn is_empty(&self, output_id: &str) -> bool {
        self.len(output_id) == 0
    }
}

impl LogStore for MemoryLogStore {
    fn append(&mut self, output_id: &str, entry: NewEntry) -> Result<EntryId, ContractError> {
        Ok(self.partitions.push(output_id, entry).id)
    }

    fn fetch(&self, output_id: &str, limit: usize) -> Result<Vec<BufferedEntry>, ContractError> {
        Ok(self.partitions.oldest(output_id, limit))
    }

    fn delete_by_ids(&mut self, output_id: &str, ids: &[EntryId]) -> Result<(), ContractError> {
        self.partitions.remove_ids(output_id, ids);
        Ok(())
    }

    fn delete_older_than(
        &mut self,
        output_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, ContractError> {
        Ok(self.partitions.remove_created_up_to(output_id, cutoff))
    }
}
