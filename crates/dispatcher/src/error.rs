//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Posted an event whose kind was never registered
    #[error("log kind '{kind}' is not registered")]
    UnregisteredKind { kind: String },

    /// Two different buffered outputs share an id
    #[error("cannot register another buffered output with id '{id}'")]
    DuplicateOutputId { id: String },

    /// The router worker is gone
    #[error("router worker has stopped")]
    WorkerClosed,

    /// `build()` was called outside a tokio runtime
    #[error("router must be built inside a tokio runtime")]
    NoRuntime,

    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Sink or store error (from contract)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create an unregistered kind error
    pub fn unregistered_kind(kind: impl Into<String>) -> Self {
        Self::UnregisteredKind { kind: kind.into() }
    }

    /// Create a duplicate output id error
    pub fn duplicate_output_id(id: impl Into<String>) -> Self {
        Self::DuplicateOutputId { id: id.into() }
    }

    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
