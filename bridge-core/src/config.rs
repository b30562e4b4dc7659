//! Configuration for transfers and delimited-text handling

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::row::RowPolicy;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Transfer engine settings
    pub transfer: TransferConfig,

    /// Delimited-text reading settings
    pub inference: InferenceOptions,
}

impl BridgeConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        self.transfer.validate()
    }
}

/// Configuration for the transfer engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Rows moved per batch
    pub batch_size: usize,

    /// Thread name of the background worker
    pub worker_name: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            worker_name: "transfer-worker".to_string(),
        }
    }
}

impl TransferConfig {
    /// Config with a custom batch size
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    /// Reject unusable values
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidArgument("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Field delimiter of a delimited-text file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// `,`
    #[default]
    Comma,

    /// `;`
    Semicolon,

    /// `\t`
    Tab,

    /// `|`
    Pipe,
}

impl Delimiter {
    /// Byte written between fields
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }

    /// Delimiter for a single character
    pub fn from_char(c: char) -> Result<Self> {
        match c {
            ',' => Ok(Delimiter::Comma),
            ';' => Ok(Delimiter::Semicolon),
            '\t' => Ok(Delimiter::Tab),
            '|' => Ok(Delimiter::Pipe),
            _ => Err(Error::InvalidArgument(format!("Unsupported delimiter: {c:?}"))),
        }
    }
}

/// Options for reading delimited text and inferring its schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceOptions {
    /// Field delimiter
    pub delimiter: Delimiter,

    /// Whether the first line names the columns
    pub has_header: bool,

    /// Handling of short and long rows
    pub row_policy: RowPolicy,

    /// Infer `ByteSize`/`TimeDuration` for samples that parse as unit literals
    pub detect_units: bool,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Comma,
            has_header: true,
            row_policy: RowPolicy::Pad,
            detect_units: false,
        }
    }
}

impl InferenceOptions {
    /// Default options with another delimiter
    pub fn with_delimiter(delimiter: Delimiter) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }
}

/// Declarative description of a source or sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LocatorConfig {
    /// Delimited text file
    File {
        /// Path of the file
        path: PathBuf,

        /// Reading options; defaults apply when omitted
        #[serde(default)]
        options: InferenceOptions,
    },

    /// Table in the row store
    Table {
        /// Table name
        name: String,

        /// Columns to read; all columns when empty
        #[serde(default)]
        columns: Vec<String>,
    },
}
