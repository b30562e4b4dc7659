//! Error types for file and table locators

use thiserror::Error;

use bridge_core::Error as CoreError;

/// Error type for file and table locators
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-text format error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Table or column layout problem
    #[error("Schema error: {0}")]
    Schema(String),

    /// Malformed input
    #[error("Format error: {0}")]
    Format(String),
}

impl Error {
    /// Convert into the error the transfer engine records for a failed read
    pub fn into_source_error(self) -> CoreError {
        match self {
            Error::Core(e @ CoreError::SourceError(_)) => e,
            other => CoreError::SourceError(other.to_string()),
        }
    }

    /// Convert into the error the transfer engine records for a failed write
    pub fn into_sink_error(self) -> CoreError {
        match self {
            Error::Core(e @ CoreError::SinkError(_)) => e,
            other => CoreError::SinkError(other.to_string()),
        }
    }
}

/// Result type for file and table locators
pub type Result<T> = std::result::Result<T, Error>;
