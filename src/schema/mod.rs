//! Table schemas
//!
//! Declarative column schemas used to validate and coerce tabular data
//! before it is returned to a caller or written to a remote host.
//!
//! # Features
//!
//! - **YAML Definitions**: Schemas load from YAML or JSON files
//! - **Coercion**: Text cells are parsed into the declared type
//! - **Column Selection**: Output carries exactly the declared columns, in order

mod types;
mod validate;

pub use types::{ColumnSchema, ColumnType, TableSchema};
pub use validate::parse_datetime;
