//! Schema types

use crate::error::{Error, Result};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Logical column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Boolean,
    /// Naive timestamp with microsecond precision
    Datetime,
    Date,
}

impl ColumnType {
    /// Arrow type used to store the column
    pub fn data_type(self) -> DataType {
        match self {
            ColumnType::String => DataType::Utf8,
            ColumnType::Integer => DataType::Int64,
            ColumnType::Float => DataType::Float64,
            ColumnType::Boolean => DataType::Boolean,
            ColumnType::Datetime => DataType::Timestamp(TimeUnit::Microsecond, None),
            ColumnType::Date => DataType::Date32,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Datetime => write!(f, "datetime"),
            ColumnType::Date => write!(f, "date"),
        }
    }
}

/// One declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name
    pub name: String,

    /// Column type
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Whether null values are allowed
    #[serde(default)]
    pub nullable: bool,

    /// Whether the column must be present in the input
    #[serde(default = "default_true")]
    pub required: bool,
}

impl ColumnSchema {
    /// Create a required, non-nullable column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            required: true,
        }
    }

    /// Allow nulls in this column
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Allow the column to be absent from the input (implies nullable)
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self.nullable = true;
        self
    }

    /// Arrow field for this column
    pub fn field(&self) -> Field {
        Field::new(&self.name, self.column_type.data_type(), self.nullable)
    }
}

/// Declarative description of a tabular dataset
///
/// Validation output always carries exactly these columns, in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Optional schema name, used in log and error messages
    #[serde(default)]
    pub name: Option<String>,

    /// Declared columns
    pub columns: Vec<ColumnSchema>,

    /// Convert between compatible types (number to string, float to integer, ...)
    #[serde(default = "default_true")]
    pub coerce: bool,
}

fn default_true() -> bool {
    true
}

impl TableSchema {
    /// Create a schema from columns, with coercion enabled
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self {
            name: None,
            columns,
            coerce: true,
        }
    }

    /// Set the schema name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enable or disable coercion
    #[must_use]
    pub fn with_coerce(mut self, coerce: bool) -> Self {
        self.coerce = coerce;
        self
    }

    /// Parse a schema from YAML (JSON is valid YAML)
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let schema: TableSchema = serde_yaml::from_str(yaml)?;
        schema.check()?;
        Ok(schema)
    }

    /// Load a schema from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read schema file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Reject empty schemas and duplicate column names
    pub fn check(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::config(format!(
                "Schema '{}' declares no columns",
                self.display_name()
            )));
        }

        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::config(format!(
                    "Schema '{}' declares column '{}' twice",
                    self.display_name(),
                    column.name
                )));
            }
        }

        Ok(())
    }

    /// Name for messages
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    /// Column names in declared order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Check whether a column is declared
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Get a declared column
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Arrow schema with the declared columns
    pub fn arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self.columns.iter().map(ColumnSchema::field).collect();
        Arc::new(Schema::new(fields))
    }
}
