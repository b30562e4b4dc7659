//! Core types and engine for moving tabular data between files and tables
//!
//! This crate provides unit-aware values (byte sizes and durations) with
//! exact canonical arithmetic, streaming aggregation over them, the
//! column/schema/row data model, and a batched transfer engine that moves
//! rows between any two [`Locator`]s.

#![warn(missing_docs)]

pub mod aggregate;
pub mod config;
pub mod directive;
pub mod error;
pub mod locator;
pub mod parse;
pub mod row;
pub mod schema;
pub mod sink;
pub mod source;
pub mod transfer;
pub mod unit;

// Re-export key types for convenience
pub use aggregate::{aggregate, AggregateOp, Aggregator};
pub use config::{BridgeConfig, Delimiter, InferenceOptions, LocatorConfig, TransferConfig};
pub use directive::AggregateStats;
pub use error::{Error, Result};
pub use locator::{Locator, LocatorKind};
pub use parse::{parse, parse_kind};
pub use row::{Row, RowPolicy};
pub use schema::{Column, ColumnType, Schema};
pub use sink::{BatchSink, CollectingSink};
pub use source::{RowSource, VecSource};
pub use transfer::{
    Direction, JobSnapshot, TransferEngine, TransferHandle, TransferJob,
    TransferProgress, TransferStatus,
};
pub use unit::{Unit, UnitKind, UnitValue};
