//! Column and schema definitions

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::unit::UnitKind;

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// UTF-8 text
    String,

    /// 64-bit signed integer
    Int64,

    /// 64-bit floating point
    Float64,

    /// Date or date and time
    DateTime,

    /// Size literal such as `1.5MB`
    ByteSize,

    /// Duration literal such as `750ms`
    TimeDuration,
}

impl ColumnType {
    /// Unit kind carried by this column type, if any
    pub fn unit_kind(self) -> Option<UnitKind> {
        match self {
            ColumnType::ByteSize => Some(UnitKind::ByteSize),
            ColumnType::TimeDuration => Some(UnitKind::TimeDuration),
            _ => None,
        }
    }
}

impl From<UnitKind> for ColumnType {
    fn from(kind: UnitKind) -> Self {
        match kind {
            UnitKind::ByteSize => ColumnType::ByteSize,
            UnitKind::TimeDuration => ColumnType::TimeDuration,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => write!(f, "String"),
            ColumnType::Int64 => write!(f, "Int64"),
            ColumnType::Float64 => write!(f, "Float64"),
            ColumnType::DateTime => write!(f, "DateTime"),
            ColumnType::ByteSize => write!(f, "ByteSize"),
            ColumnType::TimeDuration => write!(f, "TimeDuration"),
        }
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "String" => Ok(ColumnType::String),
            "Int64" => Ok(ColumnType::Int64),
            "Float64" => Ok(ColumnType::Float64),
            "DateTime" => Ok(ColumnType::DateTime),
            "ByteSize" => Ok(ColumnType::ByteSize),
            "TimeDuration" => Ok(ColumnType::TimeDuration),
            _ => Err(Error::InvalidArgument(format!("Unknown column type: {s}"))),
        }
    }
}

/// A column in a schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Name of the column, unique within its schema
    pub name: String,

    /// Declared type
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Whether the column takes part in transfers
    pub selected: bool,

    /// Example value taken from the source
    pub sample: Option<String>,
}

impl Column {
    /// Create a selected column without a sample
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            selected: true,
            sample: None,
        }
    }

    /// Attach a sample value
    #[must_use]
    pub fn with_sample(mut self, sample: &str) -> Self {
        self.sample = Some(sample.to_string());
        self
    }

    /// Get the name of this column
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the declared type of this column
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.column_type)?;
        if !self.selected {
            write!(f, " (unselected)")?;
        }
        Ok(())
    }
}

/// Ordered set of uniquely named columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    /// Columns in source order
    columns: Vec<Column>,

    /// Column indices by name for faster lookup
    #[serde(skip)]
    column_indices: HashMap<String, usize>,
}

impl Schema {
    /// Create a schema, rejecting duplicate column names
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut column_indices = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if column_indices.insert(column.name.clone(), i).is_some() {
                return Err(Error::DuplicateColumn(column.name.clone()));
            }
        }

        Ok(Self {
            columns,
            column_indices,
        })
    }

    /// Create a schema of `String` columns with the given names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        Self::new(
            names
                .iter()
                .map(|name| Column::new(name.as_ref(), ColumnType::String))
                .collect(),
        )
    }

    /// Get all columns in this schema
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get a column by index
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Get a column by name
    pub fn column_by_name(&self, name: &str) -> Result<&Column> {
        let index = self.index_of(name)?;
        Ok(&self.columns[index])
    }

    /// Get the index of a column by name
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.column_indices
            .get(name)
            .copied()
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Check whether a column exists
    pub fn contains(&self, name: &str) -> bool {
        self.column_indices.contains_key(name)
    }

    /// Column names in order
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get the number of columns in this schema
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if this schema is empty
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Mark a column as selected or not
    pub fn set_selected(&mut self, name: &str, selected: bool) -> Result<()> {
        let index = self.index_of(name)?;
        self.columns[index].selected = selected;
        Ok(())
    }

    /// Replace the declared type of a column
    pub fn override_type(&mut self, name: &str, column_type: ColumnType) -> Result<()> {
        let index = self.index_of(name)?;
        self.columns[index].column_type = column_type;
        Ok(())
    }

    /// Selected columns, in schema order
    pub fn selected(&self) -> Vec<Column> {
        self.columns.iter().filter(|c| c.selected).cloned().collect()
    }

    /// Create a projection of this schema with only the named columns, in
    /// the order given
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| self.column_by_name(name.as_ref()).cloned())
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Append a column, rejecting a duplicate name
    pub fn with_column(&self, column: Column) -> Result<Self> {
        let mut columns = self.columns.clone();
        columns.push(column);
        Self::new(columns)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            columns: Vec<Column>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Schema::new(raw.columns).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Schema: {} columns", self.columns.len())?;
        for column in &self.columns {
            writeln!(f, "  {column}")?;
        }
        Ok(())
    }
}
