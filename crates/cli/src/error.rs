//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Input line is not a JSON object
    #[error("line {line}: {message}")]
    InvalidLine { line: u64, message: String },

    /// Input line has no usable kind field
    #[error("line {line}: missing string field '{field}'")]
    MissingKind { line: u64, field: String },

    /// Router construction from configuration failed
    #[error("Failed to build router: {0}")]
    Build(#[from] dispatcher::DispatcherError),

    /// Store could not be opened
    #[error("Failed to open store: {0}")]
    Store(#[from] contracts::ContractError),
}

impl CliError {
    pub fn invalid_line(line: u64, message: impl Into<String>) -> Self {
        Self::InvalidLine {
            line,
            message: message.into(),
        }
    }

    pub fn missing_kind(line: u64, field: impl Into<String>) -> Self {
        Self::MissingKind {
            line,
            field: field.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
