//! Delimited-text batch writer

use std::io::{self, Write};
use std::sync::Arc;

use csv::WriterBuilder;
use tracing::debug;

use bridge_core::{BatchSink, InferenceOptions, Row, Schema};

use crate::error::{Error, Result};

/// Writes batches of rows as delimited text, flushing after every batch
pub struct CsvBatchSink<W: Write> {
    /// Inner CSV writer
    writer: csv::Writer<W>,

    /// Columns written, in order
    schema: Arc<Schema>,

    /// Rows written so far
    rows_written: u64,
}

impl<W: Write> CsvBatchSink<W> {
    /// Create a writer, emitting the header line when `options.has_header`
    /// is set
    pub fn new(writer: W, schema: Arc<Schema>, options: &InferenceOptions) -> Result<Self> {
        let mut writer = WriterBuilder::new()
            .delimiter(options.delimiter.as_byte())
            .from_writer(writer);

        if options.has_header {
            writer.write_record(schema.names())?;
            writer.flush()?;
        }

        Ok(Self {
            writer,
            schema,
            rows_written: 0,
        })
    }

    /// Rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Write `rows` in schema order and flush
    pub fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            if row.schema().names() != self.schema.names() {
                return Err(Error::Schema(format!(
                    "row columns {:?} do not match file columns {:?}",
                    row.schema().names(),
                    self.schema.names()
                )));
            }
            self.writer.write_record(row.values())?;
        }
        self.writer.flush()?;
        self.rows_written += rows.len() as u64;
        debug!(rows = rows.len(), total = self.rows_written, "batch written to file");
        Ok(())
    }

    /// Flush and return the inner writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Io(io::Error::new(e.error().kind(), e.to_string())))
    }
}

impl<W: Write + Send> BatchSink for CsvBatchSink<W> {
    fn write_batch(&mut self, rows: &[Row]) -> bridge_core::Result<()> {
        self.write_rows(rows).map_err(Error::into_sink_error)
    }

    fn finish(&mut self) -> bridge_core::Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::Io(e).into_sink_error())
    }
}
