// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # Pipeline Connectors
//!
//! Two data-access connectors for pipeline jobs, both returning Arrow
//! `RecordBatch`es validated against declarative table schemas.
//!
//! ## Features
//!
//! - **Sales Feed**: OAuth client-credentials token caching and cursor
//!   pagination over a ticketing sales REST API
//! - **File Transfer**: List, exists, CSV download/upload and raw download over SFTP
//! - **Schema Validation**: Coerce and reorder rows to a YAML-defined table schema
//! - **Retrying Transport**: Exponential backoff, `Retry-After`, optional rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipeline_connectors::{
//!     FileTransferClient, FileTransferConfig, FileSecretStore, Result, SalesFeedClient,
//!     SalesFeedConfig, TableSchema,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Arc::new(FileSecretStore::new("secrets.json"));
//!     let mut sales = SalesFeedClient::new(SalesFeedConfig::load("sales.yaml")?, store)?
//!         .with_input_schema(TableSchema::load("schemas/sales.yaml")?);
//!
//!     sales.cache_authentication_token().await?;
//!     let batch = sales.get_sales().await?;
//!
//!     let sftp = FileTransferClient::new(FileTransferConfig::load("sftp.yaml")?)?;
//!     sftp.upload_csv(&batch).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │       SalesFeedClient        │   │      FileTransferClient      │
//! │  token → secret store        │   │  session per operation       │
//! │  cursor pages → batch        │   │  CSV ↔ batch, stamp, write   │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                │                                  │
//! ┌──────────┬───┴────────┬─────────┐   ┌───────────┴──┬───────────┐
//! │   HTTP   │ Pagination │ Secrets │   │ SFTP / Memory│   Table   │
//! ├──────────┴────────────┴─────────┴───┴──────────────┴───────────┤
//! │                 Schema validation  ·  Errors                   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the connectors
pub mod error;

/// Common types and type aliases
pub mod types;

/// Connector configuration loaded from YAML
pub mod config;

/// Log subscriber setup
pub mod logging;

/// HTTP client with retry and rate limiting
pub mod http;

/// Cursor pagination
pub mod pagination;

/// Secret storage for cached tokens
pub mod secrets;

/// Table schemas and validation
pub mod schema;

/// Arrow batch helpers and delimited-text codec
pub mod table;

/// Sales feed connector
pub mod sales;

/// SFTP file transfer connector
pub mod transfer;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{FileTransferConfig, RetryConfig, SalesFeedConfig};
pub use logging::init_logging;
pub use sales::{SalesFeedClient, SalesFetchReport};
pub use schema::{ColumnSchema, ColumnType, TableSchema};
pub use secrets::{FileSecretStore, InMemorySecretStore, SecretStore};
pub use transfer::{FileTransferClient, MemoryRemote, SftpOpener};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
