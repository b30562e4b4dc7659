//! Streaming aggregation over unit values
//!
//! Reduction runs over canonical integral magnitudes; the result is
//! converted to the requested output unit only once, at the end.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::unit::{Unit, UnitValue};

/// Aggregate operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    /// Total of all values
    Sum,

    /// Mean of all values, floored to a whole canonical unit
    Avg,

    /// Smallest value, first occurrence wins ties
    Min,

    /// Largest value, first occurrence wins ties
    Max,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateOp::Sum => write!(f, "sum"),
            AggregateOp::Avg => write!(f, "avg"),
            AggregateOp::Min => write!(f, "min"),
            AggregateOp::Max => write!(f, "max"),
        }
    }
}

impl FromStr for AggregateOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregateOp::Sum),
            "avg" => Ok(AggregateOp::Avg),
            "min" => Ok(AggregateOp::Min),
            "max" => Ok(AggregateOp::Max),
            _ => Err(Error::UnsupportedOperation(s.to_string())),
        }
    }
}

/// Incremental reducer for one aggregate operation
#[derive(Debug, Clone)]
pub struct Aggregator {
    op: AggregateOp,
    output_unit: Unit,
    sum: i128,
    count: u64,
    best: Option<UnitValue>,
}

impl Aggregator {
    /// Create a reducer producing its result in `output_unit`
    pub fn new(op: AggregateOp, output_unit: Unit) -> Self {
        Self {
            op,
            output_unit,
            sum: 0,
            count: 0,
            best: None,
        }
    }

    /// Operation being computed
    pub fn op(&self) -> AggregateOp {
        self.op
    }

    /// Number of values seen so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Fold one value into the running result
    pub fn push(&mut self, value: &UnitValue) -> Result<()> {
        let expected = self.output_unit.kind();
        if value.kind() != expected {
            return Err(Error::TypeMismatch(format!(
                "{} value {value} cannot be aggregated into {expected} ({})",
                value.kind(),
                self.output_unit
            )));
        }

        self.count += 1;
        match self.op {
            AggregateOp::Sum | AggregateOp::Avg => {
                self.sum += i128::from(value.canonical());
            }
            AggregateOp::Min => {
                if self.best.map_or(true, |best| value.canonical() < best.canonical()) {
                    self.best = Some(*value);
                }
            }
            AggregateOp::Max => {
                if self.best.map_or(true, |best| value.canonical() > best.canonical()) {
                    self.best = Some(*value);
                }
            }
        }
        Ok(())
    }

    /// Produce the result in the output unit
    pub fn finish(&self) -> Result<UnitValue> {
        let canonical: i128 = match self.op {
            AggregateOp::Sum => self.sum,
            AggregateOp::Avg => {
                if self.count == 0 {
                    return Err(Error::InvalidArgument(
                        "avg requires at least one value".into(),
                    ));
                }
                // values are non-negative, so integer division floors
                self.sum / i128::from(self.count)
            }
            AggregateOp::Min | AggregateOp::Max => match self.best {
                Some(best) => i128::from(best.canonical()),
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "{} requires at least one value",
                        self.op
                    )))
                }
            },
        };

        let canonical = i64::try_from(canonical).map_err(|_| {
            Error::InvalidArgument(format!("{} result overflows the canonical range", self.op))
        })?;

        if canonical == 0 {
            return Ok(UnitValue::zero(self.output_unit));
        }
        UnitValue::from_canonical(canonical, self.output_unit)
    }
}

/// Aggregate a sequence of values of one kind into `output_unit`
pub fn aggregate<I>(values: I, op: AggregateOp, output_unit: Unit) -> Result<UnitValue>
where
    I: IntoIterator,
    I::Item: Borrow<UnitValue>,
{
    let mut aggregator = Aggregator::new(op, output_unit);
    for value in values {
        aggregator.push(value.borrow())?;
    }
    aggregator.finish()
}
