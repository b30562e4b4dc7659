//! Lazy delimited-text row reader and the file locator

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::StringRecord;
use tracing::{debug, info};

use bridge_core::{
    BatchSink, InferenceOptions, Locator, LocatorKind, Row, RowPolicy, RowSource, Schema,
};

use super::infer::{builder, infer_reader, read_non_blank};
use super::writer::CsvBatchSink;
use crate::error::{Error, Result};

/// Rows read lazily from a delimited stream.
///
/// The underlying reader is dropped with the source, so abandoning it
/// mid-iteration closes the file.
pub struct CsvRowSource<R: Read> {
    /// Inner CSV reader
    reader: csv::Reader<R>,

    /// Schema rows are shaped to
    schema: Arc<Schema>,

    /// Handling of short and long records
    policy: RowPolicy,

    /// Reused record buffer
    record: StringRecord,

    /// Whether the reader is exhausted or failed
    exhausted: bool,
}

/// Read rows following `schema` from `reader`, skipping the header line when
/// `options.has_header` is set
pub fn rows<R: Read>(reader: R, schema: Arc<Schema>, options: &InferenceOptions) -> CsvRowSource<R> {
    let mut builder = builder(options);
    builder.has_headers(options.has_header);
    CsvRowSource {
        reader: builder.from_reader(reader),
        schema,
        policy: options.row_policy,
        record: StringRecord::new(),
        exhausted: false,
    }
}

impl<R: Read> CsvRowSource<R> {
    fn read_row(&mut self) -> Result<Option<Row>> {
        // blank or whitespace-only lines carry no row
        if !read_non_blank(&mut self.reader, &mut self.record)? {
            return Ok(None);
        }
        let line = self.record.position().map_or(0, csv::Position::line);
        let row = Row::from_fields(Arc::clone(&self.schema), self.record.iter(), self.policy)
            .map_err(|e| Error::Format(format!("line {line}: {e}")))?;
        Ok(Some(row))
    }
}

impl<R: Read> Iterator for CsvRowSource<R> {
    type Item = bridge_core::Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.read_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.exhausted = true;
                None
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e.into_source_error()))
            }
        }
    }
}

impl<R: Read + Send> RowSource for CsvRowSource<R> {
    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }
}

/// A delimited-text file
#[derive(Debug, Clone, PartialEq)]
pub struct FileLocator {
    path: PathBuf,
    options: InferenceOptions,
}

impl FileLocator {
    /// Create a locator for the file at `path`
    pub fn new<P: AsRef<Path>>(path: P, options: InferenceOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }

    /// Path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reading options
    pub fn options(&self) -> &InferenceOptions {
        &self.options
    }

    /// Infer the schema of the file's current contents
    pub fn infer_schema(&self) -> Result<Schema> {
        let file = File::open(&self.path)?;
        let schema = infer_reader(BufReader::new(file), &self.options)?;
        info!(path = %self.path.display(), columns = schema.len(), "inferred file schema");
        Ok(schema)
    }

    /// Open a lazy row reader over the file
    pub fn open(&self) -> Result<CsvRowSource<BufReader<File>>> {
        let schema = Arc::new(self.infer_schema()?);
        let file = File::open(&self.path)?;
        debug!(path = %self.path.display(), "opened file for reading");
        Ok(rows(BufReader::new(file), schema, &self.options))
    }

    /// Truncate the file and open a batch writer for `schema`
    pub fn create(&self, schema: Arc<Schema>) -> Result<CsvBatchSink<BufWriter<File>>> {
        let file = File::create(&self.path)?;
        debug!(path = %self.path.display(), "opened file for writing");
        CsvBatchSink::new(BufWriter::new(file), schema, &self.options)
    }
}

impl fmt::Display for FileLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl Locator for FileLocator {
    fn kind(&self) -> LocatorKind {
        LocatorKind::File
    }

    fn describe(&self) -> String {
        self.to_string()
    }

    fn schema(&self) -> bridge_core::Result<Arc<Schema>> {
        self.infer_schema()
            .map(Arc::new)
            .map_err(Error::into_source_error)
    }

    fn open_for_read(&self) -> bridge_core::Result<Box<dyn RowSource>> {
        let source = self.open().map_err(Error::into_source_error)?;
        Ok(Box::new(source))
    }

    fn open_for_write(&self, schema: Arc<Schema>) -> bridge_core::Result<Box<dyn BatchSink>> {
        let sink = self.create(schema).map_err(Error::into_sink_error)?;
        Ok(Box::new(sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{ColumnType, Delimiter, Error as CoreError};
    use std::io::{Cursor, Write};
    use test_case::test_case;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::from_names(&["id", "name", "value"]).unwrap())
    }

    #[test]
    fn test_rows_skip_header() {
        let data = "id,name,value\n1, Alice ,10.5\n2,Bob,20.1\n";
        let rows: Vec<Row> = rows(Cursor::new(data), schema(), &InferenceOptions::default())
            .collect::<bridge_core::Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some("Alice"));
        assert_eq!(rows[1].values(), &["2", "Bob", "20.1"]);
    }

    #[test_case(RowPolicy::Pad ; "pad")]
    #[test_case(RowPolicy::Strict ; "strict")]
    fn test_rows_skip_blank_lines(row_policy: RowPolicy) {
        let options = InferenceOptions {
            row_policy,
            ..InferenceOptions::default()
        };
        let data = "id,name\n1,a\n\n   \n , \n2,b\n";
        let schema = Arc::new(Schema::from_names(&["id", "name"]).unwrap());
        let rows: Vec<Row> = rows(Cursor::new(data), schema, &options)
            .collect::<bridge_core::Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values(), &["1", "a"]);
        assert_eq!(rows[1].values(), &["2", "b"]);
    }

    #[test]
    fn test_rows_pad_short_records() {
        let data = "id,name,value\n1,Alice\n2,Bob,20.1,extra\n";
        let rows: Vec<Row> = rows(Cursor::new(data), schema(), &InferenceOptions::default())
            .collect::<bridge_core::Result<_>>()
            .unwrap();

        assert_eq!(rows[0].values(), &["1", "Alice", ""]);
        assert_eq!(rows[1].values(), &["2", "Bob", "20.1"]);
    }

    #[test]
    fn test_rows_strict_policy() {
        let options = InferenceOptions {
            row_policy: RowPolicy::Strict,
            ..InferenceOptions::default()
        };
        let data = "id,name,value\n1,Alice,1\n2,Bob\n3,Carol,3\n";
        let mut source = rows(Cursor::new(data), schema(), &options);

        assert!(source.next().unwrap().is_ok());
        let err = source.next().unwrap().unwrap_err();
        assert!(matches!(&err, CoreError::SourceError(msg) if msg.contains("line 3")));
        assert!(source.next().is_none());
    }

    #[test]
    fn test_rows_without_header() {
        let options = InferenceOptions {
            has_header: false,
            ..InferenceOptions::with_delimiter(Delimiter::Semicolon)
        };
        let source = rows(Cursor::new("1;a;x\n2;b;y\n"), schema(), &options);
        assert_eq!(source.count(), 2);
    }

    #[test]
    fn test_file_locator_reads_lazily() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,size").unwrap();
        for i in 0..5 {
            writeln!(file, "{i},{i}KB").unwrap();
        }
        file.flush().unwrap();

        let locator = FileLocator::new(file.path(), InferenceOptions::default());
        assert_eq!(locator.kind(), LocatorKind::File);

        let schema = locator.schema().unwrap();
        assert_eq!(schema.column(0).unwrap().column_type, ColumnType::Int64);
        assert_eq!(schema.column(1).unwrap().sample.as_deref(), Some("0KB"));

        let mut source = locator.open_for_read().unwrap();
        let first = source.next().unwrap().unwrap();
        assert_eq!(first.get("size"), Some("0KB"));
        drop(source);

        // each open restarts from the beginning
        assert_eq!(locator.open_for_read().unwrap().count(), 5);
    }

    #[test]
    fn test_missing_file() {
        let locator = FileLocator::new("/nonexistent/input.csv", InferenceOptions::default());
        assert!(matches!(locator.open_for_read(), Err(CoreError::SourceError(_))));
    }
}
