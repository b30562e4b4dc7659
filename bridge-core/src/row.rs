//! Rows of raw string values keyed by column name

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::Schema;

/// How rows whose field count differs from the schema are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// Pad missing trailing fields with empty strings, drop excess fields
    #[default]
    Pad,

    /// Reject rows with the wrong number of fields
    Strict,
}

/// One row: a value per schema column, in schema order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<String>,
}

impl Row {
    /// Create a row with exactly one value per column
    pub fn new(schema: Arc<Schema>, values: Vec<String>) -> Result<Self> {
        Self::from_fields(schema, values, RowPolicy::Strict)
    }

    /// Create a row from raw fields, trimming each one and applying `policy`
    /// when the field count does not match
    pub fn from_fields<S: AsRef<str>>(
        schema: Arc<Schema>,
        fields: impl IntoIterator<Item = S>,
        policy: RowPolicy,
    ) -> Result<Self> {
        let mut values: Vec<String> = fields
            .into_iter()
            .map(|f| f.as_ref().trim().to_string())
            .collect();

        if values.len() != schema.len() {
            match policy {
                RowPolicy::Pad => values.resize(schema.len(), String::new()),
                RowPolicy::Strict => {
                    return Err(Error::InvalidArgument(format!(
                        "row has {} fields, expected {}",
                        values.len(),
                        schema.len()
                    )))
                }
            }
        }

        Ok(Self { schema, values })
    }

    /// Schema this row follows
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Values in schema order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Value of a column by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.schema
            .index_of(name)
            .ok()
            .map(|i| self.values[i].as_str())
    }

    /// `(column name, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.schema
            .columns()
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.name.as_str(), v.as_str()))
    }

    /// Rebuild this row against `target`, picking values by column name
    pub fn project(&self, target: &Arc<Schema>) -> Result<Self> {
        let values = target
            .columns()
            .iter()
            .map(|c| {
                self.get(&c.name)
                    .map(str::to_string)
                    .ok_or_else(|| Error::ColumnNotFound(c.name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            schema: Arc::clone(target),
            values,
        })
    }

    /// Consume the row, returning its values
    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}
