//! Error types for the pipeline connectors
//!
//! This module defines the error hierarchy shared by both connectors.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the connectors
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Secret store error: {message}")]
    SecretStore { message: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("Transport failed after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("SFTP error: {message}")]
    Sftp { message: String },

    #[error("Remote path not found: {path}")]
    RemoteNotFound { path: String },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Missing expected field '{field}' in {context}")]
    MissingField { field: String, context: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Schema validation failed for column '{column}': {message}")]
    SchemaValidation { column: String, message: String },

    #[error("CSV error: {message}")]
    Csv { message: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(attempts: u32, message: impl Into<String>) -> Self {
        Self::Transport {
            attempts,
            message: message.into(),
        }
    }

    /// Create an SFTP error
    pub fn sftp(message: impl Into<String>) -> Self {
        Self::Sftp {
            message: message.into(),
        }
    }

    /// Create a remote-not-found error
    pub fn remote_not_found(path: impl Into<String>) -> Self {
        Self::RemoteNotFound { path: path.into() }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a schema validation error
    pub fn schema(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a CSV error
    pub fn csv(message: impl Into<String>) -> Self {
        Self::Csv {
            message: message.into(),
        }
    }

    /// Create a secret store error
    pub fn secret_store(message: impl Into<String>) -> Self {
        Self::SecretStore {
            message: message.into(),
        }
    }

    /// True for the "remote path does not exist" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RemoteNotFound { .. })
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504 | 520..=524)
}

/// Result type alias for the connectors
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
