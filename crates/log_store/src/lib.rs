//! # Log Store
//!
//! Store adapters for buffered outputs.
//!
//! - [`MemoryLogStore`]: volatile, for tests and short-lived processes
//! - [`FileLogStore`]: durable, one JSON-lines file per output partition

mod file;
mod memory;
mod partitions;

pub use contracts::{BufferedEntry, EntryId, LogStore, NewEntry};
pub use file::FileLogStore;
pub use memory::MemoryLogStore;
