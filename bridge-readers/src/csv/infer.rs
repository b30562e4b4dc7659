//! Schema inference from a header line and the first data line
//!
//! Inference looks at one sample value per column and is best-effort:
//! callers may override any column's type afterwards.

use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use bridge_core::{parse, Column, ColumnType, InferenceOptions, Schema};

use crate::error::{Error, Result};

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// Infer a schema from a header line and an optional first data line
pub fn infer(header_line: &str, sample_line: Option<&str>, options: &InferenceOptions) -> Result<Schema> {
    let header = split_line(header_line, options)?
        .ok_or_else(|| Error::Format("header line is empty".into()))?;
    let sample = match sample_line {
        Some(line) => split_line(line, options)?,
        None => None,
    };
    infer_fields(&header, sample.as_ref(), options)
}

/// Infer a schema from the start of a delimited stream.
///
/// Without a header, columns are named `column_1`, `column_2`, ... and the
/// first record is the sample.
pub fn infer_reader<R: Read>(reader: R, options: &InferenceOptions) -> Result<Schema> {
    let mut reader = builder(options).from_reader(reader);
    let mut first = StringRecord::new();
    if !read_non_blank(&mut reader, &mut first)? {
        return Err(Error::Format("no data to infer a schema from".into()));
    }

    if options.has_header {
        let mut sample = StringRecord::new();
        let sample = read_non_blank(&mut reader, &mut sample)?.then_some(sample);
        infer_fields(&first, sample.as_ref(), options)
    } else {
        let names: StringRecord = (1..=first.len()).map(|i| format!("column_{i}")).collect();
        infer_fields(&names, Some(&first), options)
    }
}

/// Infer the type of one sample value
pub fn infer_type(sample: &str, options: &InferenceOptions) -> ColumnType {
    let sample = sample.trim();
    if sample.is_empty() {
        return ColumnType::String;
    }

    if is_numeric(sample) {
        return if sample.contains('.') {
            ColumnType::Float64
        } else {
            ColumnType::Int64
        };
    }

    if is_datetime(sample) {
        return ColumnType::DateTime;
    }

    if options.detect_units {
        if let Ok(value) = parse(sample) {
            return value.kind().into();
        }
    }

    ColumnType::String
}

fn infer_fields(
    header: &StringRecord,
    sample: Option<&StringRecord>,
    options: &InferenceOptions,
) -> Result<Schema> {
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let value = sample.and_then(|s| s.get(i)).map(str::trim);
            let column_type = value.map_or(ColumnType::String, |v| infer_type(v, options));
            let column = Column::new(name.trim(), column_type);
            match value {
                Some(v) => column.with_sample(v),
                None => column,
            }
        })
        .collect();

    let schema = Schema::new(columns)?;
    debug!(columns = schema.len(), "inferred schema: {:?}", schema.names());
    Ok(schema)
}

fn split_line(line: &str, options: &InferenceOptions) -> Result<Option<StringRecord>> {
    let mut reader = builder(options).from_reader(line.as_bytes());
    let mut record = StringRecord::new();
    Ok(reader.read_record(&mut record)?.then_some(record))
}

/// Read the next record that has at least one non-blank field
pub(crate) fn read_non_blank<R: Read>(
    reader: &mut csv::Reader<R>,
    record: &mut StringRecord,
) -> Result<bool> {
    while reader.read_record(record)? {
        if record.iter().any(|field| !field.trim().is_empty()) {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn builder(options: &InferenceOptions) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(options.delimiter.as_byte())
        .has_headers(false)
        .flexible(true);
    builder
}

fn is_numeric(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && s.chars().any(|c| c.is_ascii_digit())
        && s.parse::<f64>().is_ok()
}

fn is_datetime(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(s, f).is_ok())
        || DATE_FORMATS
            .iter()
            .any(|f| NaiveDate::parse_from_str(s, f).is_ok())
}
