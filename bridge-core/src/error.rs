//! Error types for the data bridge

use std::io;
use thiserror::Error;

/// Result type for data bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for data bridge operations
#[derive(Error, Debug)]
pub enum Error {
    /// Literal does not match the size or duration grammar
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Literal carries a unit suffix outside the fixed unit sets
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// Values of different kinds were combined
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Aggregate operation outside sum/avg/min/max
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Two columns share a name within one schema
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// Column is not part of the schema
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Another transfer job is already running on this engine
    #[error("A transfer job is already running")]
    AlreadyRunning,

    /// Reading from a source failed
    #[error("Source error: {0}")]
    SourceError(String),

    /// Writing to a sink failed
    #[error("Sink error: {0}")]
    SinkError(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not allowed in the current job state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration could not be decoded
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
