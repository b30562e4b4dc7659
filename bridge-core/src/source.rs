//! Row source trait for data input

use std::sync::Arc;

use crate::error::Result;
use crate::row::Row;
use crate::schema::Schema;

/// A lazy, finite sequence of rows opened from a locator.
///
/// Dropping a source mid-iteration releases whatever it holds open.
pub trait RowSource: Iterator<Item = Result<Row>> + Send {
    /// Schema the produced rows follow
    fn schema(&self) -> Arc<Schema>;

    /// Provides a hint about the total number of rows (if known)
    fn row_count_hint(&self) -> Option<u64> {
        None
    }
}

/// A source over rows already held in memory
pub struct VecSource {
    schema: Arc<Schema>,
    rows: std::vec::IntoIter<Row>,
    total: u64,
}

impl VecSource {
    /// Create a source yielding `rows` in order
    pub fn new(schema: Arc<Schema>, rows: Vec<Row>) -> Self {
        let total = rows.len() as u64;
        Self {
            schema,
            rows: rows.into_iter(),
            total,
        }
    }
}

impl Iterator for VecSource {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(Ok)
    }
}

impl RowSource for VecSource {
    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn row_count_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}
