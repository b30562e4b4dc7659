//! Source/sink capability shared by files and tables
//!
//! The transfer engine only sees this trait, so an in-memory store used in
//! tests and a real database client are interchangeable.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::Schema;
use crate::sink::BatchSink;
use crate::source::RowSource;

/// Family of a locator, used to check a job's direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    /// Delimited text file
    File,

    /// Named table in a row store
    Table,
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorKind::File => write!(f, "file"),
            LocatorKind::Table => write!(f, "table"),
        }
    }
}

/// Something that can be opened for reading rows or writing batches
pub trait Locator: Send + Sync {
    /// Which family this locator belongs to
    fn kind(&self) -> LocatorKind;

    /// Human-readable name used in logs
    fn describe(&self) -> String;

    /// Schema of the data currently behind this locator
    fn schema(&self) -> Result<Arc<Schema>>;

    /// Open a fresh lazy row sequence from the start
    fn open_for_read(&self) -> Result<Box<dyn RowSource>>;

    /// Open a sink accepting rows that follow `schema`
    fn open_for_write(&self, schema: Arc<Schema>) -> Result<Box<dyn BatchSink>>;
}
