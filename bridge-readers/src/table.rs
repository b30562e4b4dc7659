//! In-memory row store and the table locator
//!
//! The store is a thread-safe map of named tables. A batch insert is
//! validated in full before any row is appended, so a batch is either
//! stored completely or not at all.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, info};

use bridge_core::{BatchSink, Column, Locator, LocatorKind, Row, RowSource, Schema, VecSource};

use crate::error::{Error, Result};

/// Summary of a table: its name and columns, with samples from the first row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    /// Table name
    pub name: String,

    /// Columns in table order
    pub columns: Vec<Column>,

    /// Number of stored rows
    pub row_count: u64,
}

#[derive(Debug)]
struct Table {
    schema: Arc<Schema>,
    rows: Vec<Vec<String>>,
}

/// Thread-safe in-memory tables
#[derive(Debug, Default)]
pub struct RowStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl RowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<()> {
        let mut tables = self.write();
        if tables.contains_key(name) {
            return Err(Error::Schema(format!("table {name} already exists")));
        }
        info!(table = name, columns = schema.len(), "created table");
        tables.insert(
            name.to_string(),
            Table {
                schema: Arc::new(schema),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    /// Create the table with `schema` unless it already exists
    pub fn ensure_table(&self, name: &str, schema: &Schema) {
        let mut tables = self.write();
        if !tables.contains_key(name) {
            info!(table = name, columns = schema.len(), "created table on first write");
            tables.insert(
                name.to_string(),
                Table {
                    schema: Arc::new(schema.clone()),
                    rows: Vec::new(),
                },
            );
        }
    }

    /// All tables, sorted by name
    pub fn list_tables(&self) -> Vec<TableInfo> {
        let tables = self.read();
        let mut infos: Vec<TableInfo> = tables
            .iter()
            .map(|(name, table)| {
                let first = table.rows.first();
                let columns = table
                    .schema
                    .columns()
                    .iter()
                    .enumerate()
                    .map(|(i, column)| match first {
                        Some(values) => column.clone().with_sample(&values[i]),
                        None => column.clone(),
                    })
                    .collect();
                TableInfo {
                    name: name.clone(),
                    columns,
                    row_count: table.rows.len() as u64,
                }
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Schema of a table
    pub fn schema(&self, name: &str) -> Result<Arc<Schema>> {
        self.read()
            .get(name)
            .map(|t| Arc::clone(&t.schema))
            .ok_or_else(|| missing(name))
    }

    /// Number of rows in a table
    pub fn row_count(&self, name: &str) -> Result<u64> {
        self.read()
            .get(name)
            .map(|t| t.rows.len() as u64)
            .ok_or_else(|| missing(name))
    }

    /// Copy of a table's rows
    pub fn rows(&self, name: &str) -> Result<Vec<Row>> {
        let tables = self.read();
        let table = tables.get(name).ok_or_else(|| missing(name))?;
        table
            .rows
            .iter()
            .map(|values| Ok(Row::new(Arc::clone(&table.schema), values.clone())?))
            .collect()
    }

    /// Append a batch. Values are matched to table columns by name; table
    /// columns absent from a row are stored empty.
    pub fn insert_batch(&self, name: &str, rows: &[Row]) -> Result<()> {
        let mut tables = self.write();
        let table = tables.get_mut(name).ok_or_else(|| missing(name))?;

        let mut batch = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some((column, _)) = row.iter().find(|(c, _)| !table.schema.contains(c)) {
                return Err(Error::Schema(format!("table {name} has no column {column}")));
            }
            let values: Vec<String> = table
                .schema
                .columns()
                .iter()
                .map(|c| row.get(&c.name).unwrap_or_default().to_string())
                .collect();
            batch.push(values);
        }

        table.rows.append(&mut batch);
        debug!(table = name, rows = rows.len(), total = table.rows.len(), "inserted batch");
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Table>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Table>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn missing(name: &str) -> Error {
    Error::Schema(format!("table {name} does not exist"))
}

/// A named table in a [`RowStore`], optionally restricted to some columns
#[derive(Clone)]
pub struct TableLocator {
    store: Arc<RowStore>,
    table: String,
    columns: Vec<String>,
}

impl TableLocator {
    /// Locate `table`; an empty `columns` list means every column
    pub fn new(store: Arc<RowStore>, table: &str, columns: Vec<String>) -> Self {
        Self {
            store,
            table: table.to_string(),
            columns,
        }
    }

    /// Table name
    pub fn table(&self) -> &str {
        &self.table
    }

    fn read_schema(&self) -> Result<Arc<Schema>> {
        let schema = self.store.schema(&self.table)?;
        if self.columns.is_empty() {
            Ok(schema)
        } else {
            Ok(Arc::new(schema.project(&self.columns)?))
        }
    }

    fn read_rows(&self) -> Result<VecSource> {
        let schema = self.read_schema()?;
        let rows = self
            .store
            .rows(&self.table)?
            .iter()
            .map(|row| Ok(row.project(&schema)?))
            .collect::<Result<Vec<_>>>()?;
        Ok(VecSource::new(schema, rows))
    }
}

impl fmt::Debug for TableLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableLocator")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl Locator for TableLocator {
    fn kind(&self) -> LocatorKind {
        LocatorKind::Table
    }

    fn describe(&self) -> String {
        format!("table {}", self.table)
    }

    fn schema(&self) -> bridge_core::Result<Arc<Schema>> {
        self.read_schema().map_err(Error::into_source_error)
    }

    fn open_for_read(&self) -> bridge_core::Result<Box<dyn RowSource>> {
        let source = self.read_rows().map_err(Error::into_source_error)?;
        Ok(Box::new(source))
    }

    fn open_for_write(&self, schema: Arc<Schema>) -> bridge_core::Result<Box<dyn BatchSink>> {
        self.store.ensure_table(&self.table, &schema);
        Ok(Box::new(TableSink {
            store: Arc::clone(&self.store),
            table: self.table.clone(),
        }))
    }
}

struct TableSink {
    store: Arc<RowStore>,
    table: String,
}

impl BatchSink for TableSink {
    fn write_batch(&mut self, rows: &[Row]) -> bridge_core::Result<()> {
        self.store
            .insert_batch(&self.table, rows)
            .map_err(Error::into_sink_error)
    }

    fn finish(&mut self) -> bridge_core::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{ColumnType, Error as CoreError, RowPolicy};

    fn hits_schema() -> Schema {
        Schema::new(vec![
            Column::new("WatchID", ColumnType::Int64),
            Column::new("URL", ColumnType::String),
            Column::new("Size", ColumnType::ByteSize),
        ])
        .unwrap()
    }

    fn row(schema: &Arc<Schema>, values: &[&str]) -> Row {
        Row::from_fields(Arc::clone(schema), values, RowPolicy::Strict).unwrap()
    }

    #[test]
    fn test_create_and_list() {
        let store = RowStore::new();
        store.create_table("visits", Schema::from_names(&["id"]).unwrap()).unwrap();
        store.create_table("hits", hits_schema()).unwrap();
        assert!(store.create_table("hits", hits_schema()).is_err());

        let schema = store.schema("hits").unwrap();
        store
            .insert_batch("hits", &[row(&schema, &["1", "/a", "2KB"]), row(&schema, &["2", "/b", "1MB"])])
            .unwrap();

        let tables = store.list_tables();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "hits");
        assert_eq!(tables[0].row_count, 2);
        assert_eq!(tables[0].columns[1].sample.as_deref(), Some("/a"));
        assert_eq!(tables[1].columns[0].sample, None);
    }

    #[test]
    fn test_insert_matches_columns_by_name() {
        let store = RowStore::new();
        store.create_table("hits", hits_schema()).unwrap();

        let partial = Arc::new(Schema::from_names(&["Size", "WatchID"]).unwrap());
        store.insert_batch("hits", &[row(&partial, &["4KB", "9"])]).unwrap();

        let rows = store.rows("hits").unwrap();
        assert_eq!(rows[0].values(), &["9", "", "4KB"]);
    }

    #[test]
    fn test_batch_is_atomic() {
        let store = RowStore::new();
        store.create_table("hits", hits_schema()).unwrap();
        let schema = store.schema("hits").unwrap();
        let foreign = Arc::new(Schema::from_names(&["Referer"]).unwrap());

        let err = store
            .insert_batch("hits", &[row(&schema, &["1", "/a", "1KB"]), row(&foreign, &["x"])])
            .unwrap_err();
        assert!(err.to_string().contains("no column Referer"));
        assert_eq!(store.row_count("hits").unwrap(), 0);
    }

    #[test]
    fn test_missing_table() {
        let store = RowStore::new();
        assert!(store.row_count("nope").is_err());
        assert!(store.insert_batch("nope", &[]).is_err());
    }

    #[test]
    fn test_locator_projection() {
        let store = Arc::new(RowStore::new());
        store.create_table("hits", hits_schema()).unwrap();
        let schema = store.schema("hits").unwrap();
        store.insert_batch("hits", &[row(&schema, &["1", "/a", "2KB"])]).unwrap();

        let locator = TableLocator::new(Arc::clone(&store), "hits", vec!["Size".into(), "WatchID".into()]);
        assert_eq!(locator.schema().unwrap().names(), vec!["Size", "WatchID"]);

        let mut source = locator.open_for_read().unwrap();
        assert_eq!(source.row_count_hint(), Some(1));
        assert_eq!(source.next().unwrap().unwrap().values(), &["2KB", "1"]);
    }

    #[test]
    fn test_locator_write_creates_table() {
        let store = Arc::new(RowStore::new());
        let locator = TableLocator::new(Arc::clone(&store), "imported", Vec::new());
        assert!(matches!(locator.schema(), Err(CoreError::SourceError(_))));

        let schema = Arc::new(hits_schema());
        let mut sink = locator.open_for_write(Arc::clone(&schema)).unwrap();
        sink.write_batch(&[row(&schema, &["1", "/a", "1KB"])]).unwrap();
        sink.finish().unwrap();

        assert_eq!(store.row_count("imported").unwrap(), 1);
        assert_eq!(locator.describe(), "table imported");
    }

    #[test]
    fn test_write_unknown_column_is_sink_error() {
        let store = Arc::new(RowStore::new());
        store.create_table("hits", hits_schema()).unwrap();
        let locator = TableLocator::new(Arc::clone(&store), "hits", Vec::new());

        let other = Arc::new(Schema::from_names(&["Referer"]).unwrap());
        let mut sink = locator.open_for_write(Arc::clone(&other)).unwrap();
        assert!(matches!(
            sink.write_batch(&[row(&other, &["x"])]),
            Err(CoreError::SinkError(_))
        ));
    }
}
