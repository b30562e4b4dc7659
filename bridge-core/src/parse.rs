//! Parser for human-readable size and duration literals
//!
//! Accepted forms are `^\d+(\.\d+)?(KB|MB|GB|TB)$` and
//! `^\d+(\.\d+)?(ms|s|m|h|d)$`, both case-insensitive, with no whitespace
//! anywhere in the literal.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};
use crate::unit::{Unit, UnitKind, UnitValue};

lazy_static! {
    /// Number followed by a suffix starting with a letter; the suffix is resolved separately
    static ref LITERAL: Regex = Regex::new(r"^(\d+(?:\.\d+)?)(\p{L}\S*)$").unwrap();
}

/// Parse a literal such as `1.5MB` or `750ms`
pub fn parse(literal: &str) -> Result<UnitValue> {
    let captures = LITERAL
        .captures(literal)
        .ok_or_else(|| Error::InvalidFormat(literal.to_string()))?;

    let number = &captures[1];
    let suffix = &captures[2];

    // the whole suffix has to name one unit, so `ms` never splits into `m` + `s`
    let unit = Unit::from_suffix(suffix)
        .ok_or_else(|| Error::UnknownUnit(format!("{suffix} in {literal}")))?;

    let magnitude: f64 = number
        .parse()
        .map_err(|_| Error::InvalidFormat(literal.to_string()))?;

    UnitValue::new(magnitude, unit).map_err(|e| match e {
        Error::InvalidArgument(msg) => Error::InvalidFormat(msg),
        other => other,
    })
}

/// Parse a literal and require it to be of `kind`
pub fn parse_kind(literal: &str, kind: UnitKind) -> Result<UnitValue> {
    let value = parse(literal)?;
    if value.kind() == kind {
        Ok(value)
    } else {
        Err(Error::TypeMismatch(format!(
            "expected {kind} literal, found {} in {literal}",
            value.kind()
        )))
    }
}
