//! LogStore trait - durable queue consumed by buffered outputs
//!
//! One logical partition per output id. The router only touches a store from
//! its single worker, so implementations need durability, not locking.

use chrono::{DateTime, Utc};

use crate::{BufferedEntry, ContractError, EntryId, NewEntry};

/// Append-only keyed queue
pub trait LogStore: Send {
    /// Append an entry to the partition and return its id
    ///
    /// # Errors
    /// Returns [`ContractError::Store`] if the entry could not be persisted.
    fn append(&mut self, output_id: &str, entry: NewEntry) -> Result<EntryId, ContractError>;

    /// Up to `limit` entries of the partition, oldest first
    ///
    /// # Errors
    /// Returns [`ContractError::Store`] on read failure.
    fn fetch(&self, output_id: &str, limit: usize) -> Result<Vec<BufferedEntry>, ContractError>;

    /// Delete the listed entries from the partition
    ///
    /// # Errors
    /// Returns [`ContractError::Store`] on write failure.
    fn delete_by_ids(&mut self, output_id: &str, ids: &[EntryId]) -> Result<(), ContractError>;

    /// Delete every entry created at or before `cutoff`; returns how many
    ///
    /// # Errors
    /// Returns [`ContractError::Store`] on write failure.
    fn delete_older_than(
        &mut self,
        output_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, ContractError>;
}

impl<S: LogStore + ?Sized> LogStore for Box<S> {
    fn append(&mut self, output_id: &str, entry: NewEntry) -> Result<EntryId, ContractError> {
        (**self).append(output_id, entry)
    }

    fn fetch(&self, output_id: &str, limit: usize) -> Result<Vec<BufferedEntry>, ContractError> {
        (**self).fetch(output_id, limit)
    }

    fn delete_by_ids(&mut self, output_id: &str, ids: &[EntryId]) -> Result<(), ContractError> {
        (**self).delete_by_ids(output_id, ids)
    }

    fn delete_older_than(
        &mut self,
        output_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, ContractError> {
        (**self).delete_older_than(output_id, cutoff)
    }
}
