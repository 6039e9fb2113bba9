//! Tabular results
//!
//! Both connectors hand back Arrow `RecordBatch`es. This module holds the
//! batch helpers and the delimited-text codec used for CSV transfer.

mod convert;
mod csv;

pub use self::csv::{read_delimited, write_delimited};
pub use convert::{
    batch_to_records, column_by_name, concat, empty_batch, stamp_timestamp, with_column,
};

#[cfg(test)]
mod tests;
