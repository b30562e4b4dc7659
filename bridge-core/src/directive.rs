//! The `aggregate-stats` directive
//!
//! ```text
//! aggregate-stats <op> <source-column> <dest-column> [output-unit]
//! ```
//!
//! Reduces every unit literal in `source-column` and appends the result to
//! each row as `dest-column`. Empty cells are skipped.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{AggregateOp, Aggregator};
use crate::error::{Error, Result};
use crate::parse::parse;
use crate::row::Row;
use crate::schema::{Column, ColumnType};
use crate::unit::{Unit, UnitKind, UnitValue};

const NAME: &str = "aggregate-stats";

/// A parsed `aggregate-stats` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Reduction to apply
    pub op: AggregateOp,

    /// Column holding unit literals
    pub source_column: String,

    /// Column receiving the formatted result
    pub dest_column: String,

    /// Unit of the result; the base unit of the values' kind when absent
    pub output_unit: Option<Unit>,
}

impl AggregateStats {
    /// Parse a directive line
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some(NAME) => {}
            Some(other) => {
                return Err(Error::UnsupportedOperation(format!(
                    "unknown directive {other}"
                )))
            }
            None => return Err(Error::InvalidArgument("empty directive".into())),
        }

        let usage = || Error::InvalidArgument(format!(
            "usage: {NAME} <op> <source-column> <dest-column> [output-unit]"
        ));
        let op: AggregateOp = tokens.next().ok_or_else(usage)?.parse()?;
        let source_column = tokens.next().ok_or_else(usage)?.to_string();
        let dest_column = tokens.next().ok_or_else(usage)?.to_string();
        let output_unit = tokens.next().map(str::parse::<Unit>).transpose()?;
        if tokens.next().is_some() {
            return Err(usage());
        }

        Ok(Self {
            op,
            source_column,
            dest_column,
            output_unit,
        })
    }

    /// Aggregate the source column over `rows`
    pub fn evaluate(&self, rows: &[Row]) -> Result<UnitValue> {
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let cell = row
                .get(&self.source_column)
                .ok_or_else(|| Error::ColumnNotFound(self.source_column.clone()))?;
            if !cell.is_empty() {
                values.push(parse(cell)?);
            }
        }

        let output_unit = match self.output_unit {
            Some(unit) => unit,
            None => self.default_unit(rows, &values)?,
        };

        let mut aggregator = Aggregator::new(self.op, output_unit);
        for value in &values {
            aggregator.push(value)?;
        }
        let result = aggregator.finish()?;
        debug!(
            op = %self.op,
            column = %self.source_column,
            values = aggregator.count(),
            result = %result,
            "aggregate-stats evaluated"
        );
        Ok(result)
    }

    /// Return `rows` with the destination column appended, holding the
    /// aggregate in every row
    pub fn execute(&self, rows: &[Row]) -> Result<Vec<Row>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };

        let result = self.evaluate(rows)?;
        let schema = Arc::new(first.schema().with_column(Column::new(
            &self.dest_column,
            ColumnType::from(result.kind()),
        ))?);
        let formatted = result.to_string();

        rows.iter()
            .map(|row| {
                if row.schema() != first.schema() {
                    return Err(Error::InvalidArgument(
                        "rows passed to aggregate-stats must share one schema".into(),
                    ));
                }
                let mut values = row.values().to_vec();
                values.push(formatted.clone());
                Row::new(Arc::clone(&schema), values)
            })
            .collect()
    }

    fn default_unit(&self, rows: &[Row], values: &[UnitValue]) -> Result<Unit> {
        let declared = rows
            .first()
            .and_then(|row| row.schema().column_by_name(&self.source_column).ok())
            .and_then(|column| column.column_type().unit_kind());
        let kind: Option<UnitKind> = declared.or_else(|| values.first().map(UnitValue::kind));

        kind.map(UnitKind::base_unit).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "cannot pick an output unit for {}: no values and no unit column type",
                self.source_column
            ))
        })
    }
}

impl FromStr for AggregateStats {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AggregateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{NAME} {} {} {}",
            self.op, self.source_column, self.dest_column
        )?;
        if let Some(unit) = self.output_unit {
            write!(f, " {unit}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowPolicy;
    use crate::schema::Schema;
    use test_case::test_case;

    fn rows(column_type: ColumnType, cells: &[&str]) -> Vec<Row> {
        let schema = Arc::new(
            Schema::new(vec![
                Column::new("host", ColumnType::String),
                Column::new("body", column_type),
            ])
            .unwrap(),
        );
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                Row::from_fields(
                    Arc::clone(&schema),
                    [format!("h{i}"), (*cell).to_string()],
                    RowPolicy::Strict,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_parse() {
        let directive = AggregateStats::parse("aggregate-stats sum body total MB").unwrap();
        assert_eq!(directive.op, AggregateOp::Sum);
        assert_eq!(directive.source_column, "body");
        assert_eq!(directive.dest_column, "total");
        assert_eq!(directive.output_unit, Some(Unit::Megabytes));
        assert_eq!(directive.to_string(), "aggregate-stats sum body total MB");

        let directive: AggregateStats = "aggregate-stats  avg body mean".parse().unwrap();
        assert_eq!(directive.output_unit, None);
    }

    #[test_case("aggregate-stats median body out" ; "unknown op")]
    #[test_case("filter-rows body" ; "unknown directive")]
    fn test_parse_unsupported(line: &str) {
        assert!(matches!(
            AggregateStats::parse(line),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test_case("" ; "empty")]
    #[test_case("aggregate-stats sum body" ; "missing dest")]
    #[test_case("aggregate-stats sum body out KB extra" ; "trailing token")]
    fn test_parse_usage(line: &str) {
        assert!(matches!(
            AggregateStats::parse(line),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_unknown_unit() {
        assert!(matches!(
            AggregateStats::parse("aggregate-stats sum body out PB"),
            Err(Error::UnknownUnit(_))
        ));
    }

    #[test]
    fn test_execute_appends_result() {
        let input = rows(ColumnType::ByteSize, &["1KB", "1MB"]);
        let directive = AggregateStats::parse("aggregate-stats sum body total KB").unwrap();
        let output = directive.execute(&input).unwrap();

        assert_eq!(output.len(), 2);
        for row in &output {
            assert_eq!(row.get("total"), Some("1025KB"));
        }
        let column = output[0].schema().column_by_name("total").unwrap();
        assert_eq!(column.column_type(), ColumnType::ByteSize);
    }

    #[test]
    fn test_default_unit_from_column_type() {
        let input = rows(ColumnType::TimeDuration, &["1s", "500ms", ""]);
        let directive = AggregateStats::parse("aggregate-stats max body slowest").unwrap();
        let result = directive.evaluate(&input).unwrap();
        assert_eq!(result.unit(), Unit::Milliseconds);
        assert_eq!(result.magnitude(), 1000.0);
    }

    #[test]
    fn test_default_unit_from_values() {
        let input = rows(ColumnType::String, &["2GB"]);
        let directive = AggregateStats::parse("aggregate-stats min body smallest").unwrap();
        let result = directive.evaluate(&input).unwrap();
        assert_eq!(result.unit(), Unit::Kilobytes);
        assert_eq!(result.magnitude(), 2_097_152.0);
    }

    #[test]
    fn test_missing_source_column() {
        let input = rows(ColumnType::ByteSize, &["1KB"]);
        let directive = AggregateStats::parse("aggregate-stats sum size total").unwrap();
        assert!(matches!(
            directive.evaluate(&input),
            Err(Error::ColumnNotFound(name)) if name == "size"
        ));
    }

    #[test]
    fn test_mixed_kinds_rejected() {
        let input = rows(ColumnType::String, &["1KB", "3s"]);
        let directive = AggregateStats::parse("aggregate-stats sum body total").unwrap();
        assert!(matches!(directive.evaluate(&input), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_execute_without_rows() {
        let directive = AggregateStats::parse("aggregate-stats sum body total").unwrap();
        assert!(directive.execute(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_dest_column_collision() {
        let input = rows(ColumnType::ByteSize, &["1KB"]);
        let directive = AggregateStats::parse("aggregate-stats sum body host").unwrap();
        assert!(matches!(directive.execute(&input), Err(Error::DuplicateColumn(_))));
    }
}
