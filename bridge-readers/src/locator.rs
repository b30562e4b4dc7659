//! Locators built from declarative configuration

use std::sync::Arc;

use bridge_core::{BatchSink, Locator, LocatorConfig, LocatorKind, RowSource, Schema};

use crate::csv::FileLocator;
use crate::table::{RowStore, TableLocator};

/// Either concrete locator
#[derive(Debug, Clone)]
pub enum AnyLocator {
    /// Delimited-text file
    File(FileLocator),

    /// Table in a row store
    Table(TableLocator),
}

impl AnyLocator {
    /// Build the locator described by `config`; tables resolve against `store`
    pub fn from_config(config: &LocatorConfig, store: &Arc<RowStore>) -> Self {
        match config {
            LocatorConfig::File { path, options } => {
                AnyLocator::File(FileLocator::new(path, *options))
            }
            LocatorConfig::Table { name, columns } => {
                AnyLocator::Table(TableLocator::new(Arc::clone(store), name, columns.clone()))
            }
        }
    }

    /// Share as a trait object for a transfer job
    pub fn into_shared(self) -> Arc<dyn Locator> {
        match self {
            AnyLocator::File(file) => Arc::new(file),
            AnyLocator::Table(table) => Arc::new(table),
        }
    }

    fn inner(&self) -> &dyn Locator {
        match self {
            AnyLocator::File(file) => file,
            AnyLocator::Table(table) => table,
        }
    }
}

impl From<FileLocator> for AnyLocator {
    fn from(file: FileLocator) -> Self {
        AnyLocator::File(file)
    }
}

impl From<TableLocator> for AnyLocator {
    fn from(table: TableLocator) -> Self {
        AnyLocator::Table(table)
    }
}

impl Locator for AnyLocator {
    fn kind(&self) -> LocatorKind {
        self.inner().kind()
    }

    fn describe(&self) -> String {
        self.inner().describe()
    }

    fn schema(&self) -> bridge_core::Result<Arc<Schema>> {
        self.inner().schema()
    }

    fn open_for_read(&self) -> bridge_core::Result<Box<dyn RowSource>> {
        self.inner().open_for_read()
    }

    fn open_for_write(&self, schema: Arc<Schema>) -> bridge_core::Result<Box<dyn BatchSink>> {
        self.inner().open_for_write(schema)
    }
}
