//! Sink implementations
//!
//! Contains LogSink, FileSink, NetworkSink and the SpawnedSink adapter.

mod file;
mod log;
mod network;
mod spawned;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::network::{NetworkSink, NetworkSinkConfig};
pub use self::spawned::SpawnedSink;
