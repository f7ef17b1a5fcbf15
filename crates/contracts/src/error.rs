//! Layered error definitions
//!
//! Categorized by source: config / serialize / store / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Serialization Errors =====
    /// Log event could not be turned into a document
    #[error("cannot serialize log of kind '{kind}': {message}")]
    Serialize { kind: String, message: String },

    // ===== Store Errors =====
    /// Durable store operation failed
    #[error("store error for output '{output_id}': {message}")]
    Store { output_id: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    /// Sink dropped its completion handle without reporting an outcome
    #[error("sink '{sink_name}' abandoned the flush without reporting")]
    CompletionAbandoned { sink_name: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create serialization error
    pub fn serialize(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialize {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create store error
    pub fn store(output_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            output_id: output_id.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
