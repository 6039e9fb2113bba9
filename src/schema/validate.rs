//! Row validation and coercion against a `TableSchema`
//!
//! Text is the universal carrier: a string value is always parsed into the
//! declared type (CSV cells and JSON strings alike). The schema's `coerce`
//! flag additionally allows number/boolean conversions between non-string
//! JSON values.

use super::types::{ColumnSchema, ColumnType, TableSchema};
use crate::error::{Error, Result};
use crate::table::batch_to_records;
use crate::types::JsonObject;
use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::sync::Arc;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

impl TableSchema {
    /// Validate JSON rows and build a batch with exactly the declared columns
    ///
    /// Undeclared keys are dropped. A required column must appear in at least
    /// one row; a missing or null cell is only accepted in nullable columns.
    pub fn validate_records(&self, records: &[JsonObject]) -> Result<RecordBatch> {
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());

        for column in &self.columns {
            let present = records.iter().any(|r| r.contains_key(&column.name));
            if column.required && !present && !records.is_empty() {
                return Err(Error::schema(
                    &column.name,
                    format!("column missing from input (schema '{}')", self.display_name()),
                ));
            }

            let values: Vec<Option<&Value>> = records
                .iter()
                .map(|r| r.get(&column.name).filter(|v| !v.is_null()))
                .collect();

            arrays.push(build_column(column, &values, self.coerce)?);
        }

        let options = RecordBatchOptions::new().with_row_count(Some(records.len()));
        Ok(RecordBatch::try_new_with_options(
            self.arrow_schema(),
            arrays,
            &options,
        )?)
    }

    /// Validate an existing batch, reordering it to the declared columns
    pub fn validate_batch(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let input = batch.schema();
        for column in self.columns.iter().filter(|c| c.required) {
            if input.field_with_name(&column.name).is_err() {
                return Err(Error::schema(
                    &column.name,
                    format!("column missing from input (schema '{}')", self.display_name()),
                ));
            }
        }

        let records = batch_to_records(batch)?;
        self.validate_records(&records)
    }
}

fn build_column(column: &ColumnSchema, values: &[Option<&Value>], coerce: bool) -> Result<ArrayRef> {
    let ty = column.column_type;
    let name = column.name.as_str();

    let array: ArrayRef = match ty {
        ColumnType::String => {
            let cells = convert(values, column, |v| to_string(v, coerce))?;
            Arc::new(StringArray::from(cells))
        }
        ColumnType::Integer => {
            let cells = convert(values, column, |v| to_i64(v, coerce))?;
            Arc::new(Int64Array::from(cells))
        }
        ColumnType::Float => {
            let cells = convert(values, column, |v| to_f64(v, coerce))?;
            Arc::new(Float64Array::from(cells))
        }
        ColumnType::Boolean => {
            let cells = convert(values, column, |v| to_bool(v, coerce))?;
            Arc::new(BooleanArray::from(cells))
        }
        ColumnType::Datetime => {
            let cells = convert(values, column, |v| {
                v.as_str()
                    .and_then(parse_datetime)
                    .map(|dt| dt.and_utc().timestamp_micros())
            })?;
            Arc::new(TimestampMicrosecondArray::from(cells))
        }
        ColumnType::Date => {
            let cells = convert(values, column, |v| {
                v.as_str().and_then(parse_date).map(days_since_epoch)
            })?;
            Arc::new(Date32Array::from(cells))
        }
    };

    if !column.nullable && array.null_count() > 0 {
        let row = (0..array.len()).find(|&i| array.is_null(i)).unwrap_or(0);
        return Err(Error::schema(
            name,
            format!(
                "{} null value(s) in non-nullable column, first at row {row}",
                array.null_count()
            ),
        ));
    }

    Ok(array)
}

/// Convert every present cell, treating blank text as null for non-string columns
fn convert<T>(
    values: &[Option<&Value>],
    column: &ColumnSchema,
    f: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    values
        .iter()
        .enumerate()
        .map(|(row, cell)| match *cell {
            None => Ok(None),
            Some(Value::String(s))
                if column.column_type != ColumnType::String && s.trim().is_empty() =>
            {
                Ok(None)
            }
            Some(value) => f(value).map(Some).ok_or_else(|| {
                Error::schema(
                    &column.name,
                    format!("row {row}: cannot convert {value} to {}", column.column_type),
                )
            }),
        })
        .collect()
}

fn to_string(value: &Value, coerce: bool) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) if coerce => Some(value.to_string()),
        _ => None,
    }
}

fn to_i64(value: &Value, coerce: bool) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|_| coerce).and_then(whole_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|_| coerce)
                    .and_then(whole_f64)
            })
        }
        Value::Bool(b) if coerce => Some(i64::from(*b)),
        _ => None,
    }
}

fn whole_f64(f: f64) -> Option<i64> {
    #[allow(clippy::cast_precision_loss)]
    let in_range = f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64;
    in_range.then_some(f as i64)
}

fn to_f64(value: &Value, coerce: bool) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) if coerce => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn to_bool(value: &Value, coerce: bool) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        Value::Number(n) if coerce => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Parse the date-time shapes seen in API payloads and CSV exports
///
/// Offsets are normalized to UTC; a bare date means midnight.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::default();
    (date - epoch).num_days() as i32
}
