//! Byte-size and time-duration values
//!
//! A [`UnitValue`] keeps the magnitude and unit it was written with, plus a
//! canonical integral magnitude (bytes or milliseconds) that all arithmetic
//! runs on. Byte sizes use 1024-based multipliers, durations SI/clock ones.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kind of measurement a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Sizes, canonical unit is the byte
    ByteSize,

    /// Durations, canonical unit is the millisecond
    TimeDuration,
}

impl UnitKind {
    /// Smallest unit of this kind that literals can name
    pub fn base_unit(self) -> Unit {
        match self {
            UnitKind::ByteSize => Unit::Kilobytes,
            UnitKind::TimeDuration => Unit::Milliseconds,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::ByteSize => write!(f, "ByteSize"),
            UnitKind::TimeDuration => write!(f, "TimeDuration"),
        }
    }
}

/// Unit of a size or duration literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// 1024 bytes
    #[serde(rename = "KB")]
    Kilobytes,

    /// 1024 kilobytes
    #[serde(rename = "MB")]
    Megabytes,

    /// 1024 megabytes
    #[serde(rename = "GB")]
    Gigabytes,

    /// 1024 gigabytes
    #[serde(rename = "TB")]
    Terabytes,

    /// One millisecond
    #[serde(rename = "ms")]
    Milliseconds,

    /// 1000 milliseconds
    #[serde(rename = "s")]
    Seconds,

    /// 60 seconds
    #[serde(rename = "m")]
    Minutes,

    /// 60 minutes
    #[serde(rename = "h")]
    Hours,

    /// 24 hours
    #[serde(rename = "d")]
    Days,
}

impl Unit {
    /// Every unit, ordered so that longer suffixes come before their prefixes
    /// (`ms` is tried before `m` and `s`).
    pub const MATCH_ORDER: [Unit; 9] = [
        Unit::Kilobytes,
        Unit::Megabytes,
        Unit::Gigabytes,
        Unit::Terabytes,
        Unit::Milliseconds,
        Unit::Seconds,
        Unit::Minutes,
        Unit::Hours,
        Unit::Days,
    ];

    /// Kind of measurement this unit expresses
    pub fn kind(self) -> UnitKind {
        match self {
            Unit::Kilobytes | Unit::Megabytes | Unit::Gigabytes | Unit::Terabytes => {
                UnitKind::ByteSize
            }
            Unit::Milliseconds | Unit::Seconds | Unit::Minutes | Unit::Hours | Unit::Days => {
                UnitKind::TimeDuration
            }
        }
    }

    /// Number of canonical units (bytes or milliseconds) in one of this unit
    pub fn multiplier(self) -> i64 {
        match self {
            Unit::Kilobytes => 1024,
            Unit::Megabytes => 1024 * 1024,
            Unit::Gigabytes => 1024 * 1024 * 1024,
            Unit::Terabytes => 1024 * 1024 * 1024 * 1024,
            Unit::Milliseconds => 1,
            Unit::Seconds => 1000,
            Unit::Minutes => 60 * 1000,
            Unit::Hours => 60 * 60 * 1000,
            Unit::Days => 24 * 60 * 60 * 1000,
        }
    }

    /// Suffix used when formatting a value
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Kilobytes => "KB",
            Unit::Megabytes => "MB",
            Unit::Gigabytes => "GB",
            Unit::Terabytes => "TB",
            Unit::Milliseconds => "ms",
            Unit::Seconds => "s",
            Unit::Minutes => "m",
            Unit::Hours => "h",
            Unit::Days => "d",
        }
    }

    /// Match a suffix case-insensitively against the fixed unit sets
    pub fn from_suffix(suffix: &str) -> Option<Unit> {
        Self::MATCH_ORDER
            .iter()
            .copied()
            .find(|unit| suffix.eq_ignore_ascii_case(unit.symbol()))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Unit::from_suffix(s.trim()).ok_or_else(|| Error::UnknownUnit(s.to_string()))
    }
}

/// Immutable size or duration measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitValue {
    magnitude: f64,
    unit: Unit,
    kind: UnitKind,
    canonical: i64,
}

impl UnitValue {
    /// Create a value from a magnitude and unit.
    ///
    /// The canonical magnitude is computed from the shortest decimal form of
    /// `magnitude` with exact integer arithmetic and truncated toward zero, so
    /// a value and its formatted literal always agree.
    pub fn new(magnitude: f64, unit: Unit) -> Result<Self> {
        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "magnitude must be a finite non-negative number, got {magnitude}"
            )));
        }

        let decimal = magnitude.to_string();
        let (integer, fraction) = decimal.split_once('.').unwrap_or((decimal.as_str(), ""));
        let canonical = canonical_from_decimal(integer, fraction, unit)?;

        Ok(Self {
            magnitude,
            unit,
            kind: unit.kind(),
            canonical,
        })
    }

    /// Zero in the given unit
    pub fn zero(unit: Unit) -> Self {
        Self {
            magnitude: 0.0,
            unit,
            kind: unit.kind(),
            canonical: 0,
        }
    }

    /// Express a canonical magnitude (bytes or milliseconds) in `unit`.
    ///
    /// The canonical magnitude is kept exactly; only the written magnitude
    /// is derived from it.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_canonical(canonical: i64, unit: Unit) -> Result<Self> {
        if canonical < 0 {
            return Err(Error::InvalidArgument(format!(
                "canonical magnitude must be non-negative, got {canonical}"
            )));
        }
        Ok(Self {
            magnitude: canonical as f64 / unit.multiplier() as f64,
            unit,
            kind: unit.kind(),
            canonical,
        })
    }

    /// Magnitude as written
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// Unit as written
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Kind of measurement
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Magnitude in bytes or milliseconds
    pub fn canonical(&self) -> i64 {
        self.canonical
    }

    /// Magnitude expressed in another unit of the same kind
    #[allow(clippy::cast_precision_loss)]
    pub fn value_in(&self, unit: Unit) -> Result<f64> {
        self.ensure_kind(unit)?;
        Ok(self.canonical as f64 / unit.multiplier() as f64)
    }

    /// The same measurement rewritten in another unit of the same kind
    pub fn convert(&self, unit: Unit) -> Result<Self> {
        self.ensure_kind(unit)?;
        Self::from_canonical(self.canonical, unit)
    }

    fn ensure_kind(&self, unit: Unit) -> Result<()> {
        if unit.kind() == self.kind {
            Ok(())
        } else {
            Err(Error::TypeMismatch(format!(
                "cannot express {} value in {} ({})",
                self.kind,
                unit,
                unit.kind()
            )))
        }
    }
}

impl fmt::Display for UnitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit)
    }
}

impl FromStr for UnitValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::parse::parse(s)
    }
}

impl TryFrom<String> for UnitValue {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<UnitValue> for String {
    fn from(value: UnitValue) -> Self {
        value.to_string()
    }
}

/// `integer.fraction` times the unit multiplier, truncated toward zero
fn canonical_from_decimal(integer: &str, fraction: &str, unit: Unit) -> Result<i64> {
    let out_of_range = || Error::InvalidFormat(format!("{integer}.{fraction}{unit} is out of range"));
    let multiplier = i128::from(unit.multiplier());

    let whole: i128 = integer.parse().map_err(|_| out_of_range())?;
    let mut total = whole.checked_mul(multiplier).ok_or_else(out_of_range)?;

    // digits past the 18th cannot move the result by a whole canonical unit
    let digits = &fraction[..fraction.len().min(18)];
    if !digits.is_empty() {
        let numerator: i128 = digits.parse().map_err(|_| out_of_range())?;
        let scale = 10_i128.pow(u32::try_from(digits.len()).map_err(|_| out_of_range())?);
        total = total
            .checked_add(numerator * multiplier / scale)
            .ok_or_else(out_of_range)?;
    }

    i64::try_from(total).map_err(|_| out_of_range())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Unit::Kilobytes, 1024)]
    #[test_case(Unit::Megabytes, 1_048_576)]
    #[test_case(Unit::Terabytes, 1_099_511_627_776)]
    #[test_case(Unit::Seconds, 1000)]
    #[test_case(Unit::Days, 86_400_000)]
    fn test_multipliers(unit: Unit, expected: i64) {
        assert_eq!(unit.multiplier(), expected);
    }

    #[test]
    fn test_canonical_is_exact_for_decimal_fractions() {
        // 4.35 * 1000 is 4349.999... in binary floating point
        let value = UnitValue::new(4.35, Unit::Seconds).unwrap();
        assert_eq!(value.canonical(), 4350);

        let value = UnitValue::new(2.5, Unit::Megabytes).unwrap();
        assert_eq!(value.canonical(), 2_621_440);
    }

    #[test]
    fn test_canonical_truncates() {
        let value = UnitValue::new(1.1, Unit::Kilobytes).unwrap();
        assert_eq!(value.canonical(), 1126);
    }

    #[test]
    fn test_rejects_negative_and_non_finite() {
        assert!(matches!(
            UnitValue::new(-1.0, Unit::Kilobytes),
            Err(Error::InvalidArgument(_))
        ));
        assert!(UnitValue::new(f64::NAN, Unit::Seconds).is_err());
        assert!(UnitValue::new(f64::INFINITY, Unit::Seconds).is_err());
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            UnitValue::new(1e30, Unit::Terabytes),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_conversions() {
        let value = UnitValue::new(1.5, Unit::Megabytes).unwrap();
        assert_eq!(value.value_in(Unit::Kilobytes).unwrap(), 1536.0);

        let converted = value.convert(Unit::Kilobytes).unwrap();
        assert_eq!(converted.magnitude(), 1536.0);
        assert_eq!(converted.canonical(), value.canonical());

        assert!(matches!(
            value.value_in(Unit::Seconds),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_convert_to_coarser_unit_is_exact() {
        let minute = UnitValue::new(1.0, Unit::Minutes).unwrap();
        let hours = minute.convert(Unit::Hours).unwrap();
        assert_eq!(hours.canonical(), 60_000);
        assert_eq!(hours.convert(Unit::Minutes).unwrap(), minute);
    }

    #[test]
    fn test_display_and_serde() {
        let value = UnitValue::new(2.5, Unit::Milliseconds).unwrap();
        assert_eq!(value.to_string(), "2.5ms");

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"2.5ms\"");
        let back: UnitValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);

        assert!(serde_json::from_str::<UnitValue>("\"2.5 ms\"").is_err());
    }

    #[test]
    fn test_unit_from_str() {
        assert_eq!("mb".parse::<Unit>().unwrap(), Unit::Megabytes);
        assert_eq!("MS".parse::<Unit>().unwrap(), Unit::Milliseconds);
        assert_eq!("M".parse::<Unit>().unwrap(), Unit::Minutes);
        assert!(matches!("B".parse::<Unit>(), Err(Error::UnknownUnit(_))));
    }
}
