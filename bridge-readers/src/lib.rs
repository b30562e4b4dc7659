//! File and table locators for the data bridge
//!
//! This crate provides the delimited-text side of a transfer (schema
//! inference, lazy row reading, batch writing) and an in-memory row store
//! standing in for a database, both exposed through the core `Locator`
//! trait.

#![warn(missing_docs)]

mod error;

pub mod csv;
pub mod locator;
pub mod table;

pub use crate::csv::{infer, infer_reader, infer_type, rows, CsvBatchSink, CsvRowSource, FileLocator};
pub use error::{Error, Result};
pub use locator::AnyLocator;
pub use table::{RowStore, TableInfo, TableLocator};

// Re-export core types
pub use bridge_core::{
    InferenceOptions, Locator, LocatorConfig, LocatorKind, Result as CoreResult, Schema,
};
