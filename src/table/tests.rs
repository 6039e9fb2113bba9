//! Tests for batch helpers and the delimited-text codec

use super::*;
use crate::schema::{ColumnSchema, ColumnType, TableSchema};
use arrow::array::{Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn names(batch: &arrow::record_batch::RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

fn people_batch() -> arrow::record_batch::RecordBatch {
    let schema = TableSchema::new(vec![
        ColumnSchema::new("id", ColumnType::Integer),
        ColumnSchema::new("name", ColumnType::String).nullable(),
    ]);
    let rows = vec![
        json!({"id": 1, "name": "Alice"}),
        json!({"id": 2, "name": null}),
    ];
    let records: Vec<_> = rows
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();
    schema.validate_records(&records).unwrap()
}

#[test]
fn test_batch_to_records_fills_nulls() {
    let records = batch_to_records(&people_batch()).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], json!(1));
    assert_eq!(records[0]["name"], json!("Alice"));
    assert!(records[1]["name"].is_null());
}

#[test]
fn test_batch_to_records_empty() {
    let batch = empty_batch(None);
    assert!(batch_to_records(&batch).unwrap().is_empty());
}

#[test]
fn test_empty_batch_uses_schema_columns() {
    let schema = TableSchema::new(vec![
        ColumnSchema::new("a", ColumnType::String),
        ColumnSchema::new("b", ColumnType::Float),
    ]);

    let batch = empty_batch(Some(&schema));
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(names(&batch), vec!["a", "b"]);

    assert_eq!(empty_batch(None).num_columns(), 0);
}

#[test]
fn test_concat_preserves_order() {
    let batch = people_batch();
    let joined = concat(&batch.schema(), &[batch.clone(), batch]).unwrap();

    let ids = joined
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(ids.values().to_vec(), vec![1, 2, 1, 2]);
}

#[test]
fn test_with_column_appends_and_replaces() {
    let batch = people_batch();
    let tags = Arc::new(StringArray::from(vec!["x", "y"]));
    let appended = with_column(&batch, Field::new("tag", DataType::Utf8, false), tags).unwrap();
    assert_eq!(names(&appended), vec!["id", "name", "tag"]);

    let ids = Arc::new(StringArray::from(vec!["one", "two"]));
    let replaced = with_column(&appended, Field::new("id", DataType::Utf8, false), ids).unwrap();
    assert_eq!(names(&replaced), vec!["id", "name", "tag"]);
    assert_eq!(replaced.column(0).data_type(), &DataType::Utf8);
}

#[test]
fn test_with_column_rejects_length_mismatch() {
    let batch = people_batch();
    let short = Arc::new(StringArray::from(vec!["only-one"]));
    assert!(with_column(&batch, Field::new("tag", DataType::Utf8, false), short).is_err());
}

#[test]
fn test_stamp_timestamp() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
    let stamped = stamp_timestamp(&people_batch(), "processed_date", at).unwrap();

    let (field, column) = column_by_name(&stamped, "processed_date").unwrap();
    assert!(!field.is_nullable());
    let ts = column
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .unwrap();
    assert_eq!(ts.len(), 2);
    assert_eq!(ts.value(0), at.timestamp_micros());
    assert_eq!(ts.value(1), at.timestamp_micros());
}

#[test]
fn test_read_delimited_infers_types_without_schema() {
    let csv = b"id;name\n1;Alice\n2;Bob\n";
    let batch = read_delimited(csv, b';', None).unwrap();

    assert_eq!(batch.num_rows(), 2);
    assert_eq!(names(&batch), vec!["id", "name"]);
    assert_eq!(batch.column(0).data_type(), &DataType::Int64);
}

#[test]
fn test_read_delimited_validates_with_schema() {
    let schema = TableSchema::new(vec![
        ColumnSchema::new("name", ColumnType::String),
        ColumnSchema::new("id", ColumnType::Integer),
    ]);
    let csv = b"id,name,extra\n1,Alice,x\n2,Bob,y\n";
    let batch = read_delimited(csv, b',', Some(&schema)).unwrap();

    assert_eq!(names(&batch), vec!["name", "id"]);
    let ids = batch
        .column(1)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(ids.value(1), 2);
}

#[test]
fn test_read_delimited_schema_violation() {
    let schema = TableSchema::new(vec![ColumnSchema::new("id", ColumnType::Integer)]);
    let csv = b"id\n1\nnot-a-number\n";
    let err = read_delimited(csv, b',', Some(&schema)).unwrap_err();
    assert!(matches!(
        err,
        crate::error::Error::SchemaValidation { ref column, .. } if column == "id"
    ));
}

#[test]
fn test_read_delimited_empty_input() {
    let schema = TableSchema::new(vec![ColumnSchema::new("id", ColumnType::Integer)]);
    let batch = read_delimited(b"", b',', Some(&schema)).unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(names(&batch), vec!["id"]);
}

#[test]
fn test_write_delimited_header_and_separator() {
    let text = String::from_utf8(write_delimited(&people_batch(), b'|').unwrap()).unwrap();
    let mut lines = text.lines();

    assert_eq!(lines.next(), Some("id|name"));
    assert_eq!(lines.next(), Some("1|Alice"));
    assert_eq!(lines.next(), Some("2|"));
}

#[test]
fn test_written_timestamps_read_back() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
    let stamped = stamp_timestamp(&people_batch(), "processed_date", at).unwrap();
    let bytes = write_delimited(&stamped, b',').unwrap();

    let schema = TableSchema::new(vec![
        ColumnSchema::new("id", ColumnType::Integer),
        ColumnSchema::new("processed_date", ColumnType::Datetime),
    ]);
    let batch = read_delimited(&bytes, b',', Some(&schema)).unwrap();
    let ts = batch
        .column(1)
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .unwrap();
    assert_eq!(ts.value(0), at.timestamp_micros());
}
