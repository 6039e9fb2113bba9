//! Arrow RecordBatch helpers
//!
//! Conversions between batches and JSON rows, plus the small column
//! operations the connectors need (stamping, concatenation, empty results).

use crate::error::{Error, Result};
use crate::schema::TableSchema;
use crate::types::JsonObject;
use arrow::array::{Array, ArrayRef, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::json::ArrayWriter;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Convert an Arrow RecordBatch to JSON rows
///
/// Every column of the batch appears in every row; nulls become `Value::Null`.
/// Temporal columns are rendered as ISO-8601 strings.
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<JsonObject>> {
    if batch.num_rows() == 0 {
        return Ok(Vec::new());
    }

    let mut writer = ArrayWriter::new(Vec::new());
    writer.write(batch)?;
    writer.finish()?;
    let buf = writer.into_inner();

    let rows: Vec<Value> = serde_json::from_slice(&buf)?;
    let schema = batch.schema();

    rows.into_iter()
        .map(|row| match row {
            Value::Object(mut obj) => {
                for field in schema.fields() {
                    obj.entry(field.name().clone()).or_insert(Value::Null);
                }
                Ok(obj)
            }
            other => Err(Error::decode(format!("Expected JSON object row, got {other}"))),
        })
        .collect()
}

/// Empty result: the schema's columns when given, otherwise no columns
pub fn empty_batch(schema: Option<&TableSchema>) -> RecordBatch {
    match schema {
        Some(schema) => RecordBatch::new_empty(schema.arrow_schema()),
        None => RecordBatch::new_empty(Arc::new(Schema::empty())),
    }
}

/// Concatenate page batches that share one schema, preserving order
pub fn concat(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<RecordBatch> {
    Ok(arrow::compute::concat_batches(schema, batches)?)
}

/// Replace or append a column, keeping the position of a replaced column
pub fn with_column(batch: &RecordBatch, field: Field, array: ArrayRef) -> Result<RecordBatch> {
    if array.len() != batch.num_rows() {
        return Err(Error::Other(format!(
            "Column '{}' has {} rows, batch has {}",
            field.name(),
            array.len(),
            batch.num_rows()
        )));
    }

    let schema = batch.schema();
    let mut fields: Vec<Field> = Vec::with_capacity(schema.fields().len() + 1);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len() + 1);
    let mut replaced = false;

    for (existing, column) in schema.fields().iter().zip(batch.columns()) {
        if existing.name() == field.name() {
            fields.push(field.clone());
            columns.push(Arc::clone(&array));
            replaced = true;
        } else {
            fields.push(existing.as_ref().clone());
            columns.push(Arc::clone(column));
        }
    }

    if !replaced {
        fields.push(field);
        columns.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &options,
    )?)
}

/// Append (or overwrite) a timestamp column holding `at` on every row
pub fn stamp_timestamp(batch: &RecordBatch, name: &str, at: DateTime<Utc>) -> Result<RecordBatch> {
    let micros = at.timestamp_micros();
    let array = TimestampMicrosecondArray::from(vec![micros; batch.num_rows()]);
    let field = Field::new(
        name,
        DataType::Timestamp(TimeUnit::Microsecond, None),
        false,
    );
    with_column(batch, field, Arc::new(array))
}

/// Take one column out of a batch by name
pub fn column_by_name(batch: &RecordBatch, name: &str) -> Option<(Field, ArrayRef)> {
    let schema = batch.schema();
    let index = schema.index_of(name).ok()?;
    Some((schema.field(index).clone(), Arc::clone(batch.column(index))))
}
