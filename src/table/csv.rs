//! Delimited text codec
//!
//! Reads and writes headed delimited text (CSV and friends) through
//! `arrow::csv`. Without a schema the column types are inferred; with a
//! schema every cell is read as text and validated by the schema.

use super::convert::{concat, empty_batch};
use crate::error::{Error, Result};
use crate::schema::TableSchema;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::io::Cursor;
use std::sync::Arc;

/// Timestamp layout used when writing, matching common dataframe exports
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse headed delimited text into a batch
pub fn read_delimited(
    bytes: &[u8],
    separator: u8,
    schema: Option<&TableSchema>,
) -> Result<RecordBatch> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(empty_batch(schema));
    }

    let format = Format::default()
        .with_header(true)
        .with_delimiter(separator);

    let (inferred, _) = format
        .infer_schema(Cursor::new(bytes), None)
        .map_err(|e| Error::csv(format!("Failed to read header: {e}")))?;

    let read_schema = match schema {
        // Read everything as text; the table schema decides the real types.
        Some(_) => Arc::new(Schema::new(
            inferred
                .fields()
                .iter()
                .map(|f| Field::new(f.name(), DataType::Utf8, true))
                .collect::<Vec<_>>(),
        )),
        None => Arc::new(inferred),
    };

    let reader = ReaderBuilder::new(Arc::clone(&read_schema))
        .with_header(true)
        .with_delimiter(separator)
        .build(Cursor::new(bytes))
        .map_err(|e| Error::csv(format!("Failed to open reader: {e}")))?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.map_err(|e| Error::csv(format!("Failed to parse rows: {e}")))?);
    }
    let batch = concat(&read_schema, &batches)?;

    match schema {
        Some(schema) => schema.validate_batch(&batch),
        None => Ok(batch),
    }
}

/// Serialize a batch as headed delimited text, without a row-index column
pub fn write_delimited(batch: &RecordBatch, separator: u8) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_delimiter(separator)
        .with_timestamp_format(TIMESTAMP_FORMAT.to_string())
        .build(Vec::new());

    writer
        .write(batch)
        .map_err(|e| Error::csv(format!("Failed to write rows: {e}")))?;

    Ok(writer.into_inner())
}
