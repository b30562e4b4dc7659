//! Batch sink trait and an in-memory implementation

use crate::error::Result;
use crate::row::Row;

/// A sink that consumes batches of rows
pub trait BatchSink: Send {
    /// Write one batch. Once this returns `Ok` the batch is committed and
    /// is not rolled back by later failures.
    fn write_batch(&mut self, rows: &[Row]) -> Result<()>;

    /// Flush any buffered rows and finalize
    fn finish(&mut self) -> Result<()>;
}

/// A sink that collects rows in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// The collected rows
    rows: Vec<Row>,

    /// Number of batches written
    batches: usize,

    /// Whether `finish` was called
    finished: bool,
}

impl CollectingSink {
    /// Create an empty collecting sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the collected rows
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of batches received
    pub fn batch_count(&self) -> usize {
        self.batches
    }

    /// Whether the sink was finalized
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take ownership of the collected rows
    pub fn take_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl BatchSink for CollectingSink {
    fn write_batch(&mut self, rows: &[Row]) -> Result<()> {
        self.rows.extend_from_slice(rows);
        self.batches += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
