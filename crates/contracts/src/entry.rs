//! BufferedEntry - what a store holds for a buffered output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Document;

/// Store-assigned identifier, increasing in arrival order
pub type EntryId = u64;

/// A log persisted for a buffered output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferedEntry {
    /// Unique identifier
    pub id: EntryId,

    /// When the log was enqueued
    pub created_at: DateTime<Utc>,

    /// The filtered log
    pub log: Document,
}

impl BufferedEntry {
    /// Size of the log in its compact JSON encoding
    pub fn serialized_len(&self) -> u64 {
        serialized_len(&self.log)
    }
}

/// A log about to be appended; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    /// When the log was enqueued
    pub created_at: DateTime<Utc>,

    /// The filtered log
    pub log: Document,
}

impl NewEntry {
    /// Attach the store-assigned id
    pub fn with_id(self, id: EntryId) -> BufferedEntry {
        BufferedEntry {
            id,
            created_at: self.created_at,
            log: self.log,
        }
    }
}

/// Byte length of a document's compact JSON encoding
pub fn serialized_len(log: &Document) -> u64 {
    // Map<String, Value> serialization cannot fail
    serde_json::to_vec(log).map_or(0, |bytes| bytes.len() as u64)
}
