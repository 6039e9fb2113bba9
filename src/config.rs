//! Connector configuration
//!
//! Configuration structures for the two connectors, loadable from YAML.
//! Credentials deserialize straight into `SecretString` so they are redacted
//! in `Debug` output from the moment they are read.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, HttpClientConfigBuilder, RateLimiterConfig};
use crate::types::{BackoffType, OptionStringExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use url::Url;

// ============================================================================
// Sales Feed
// ============================================================================

/// Sales API connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct SalesFeedConfig {
    /// OAuth client id
    #[serde(deserialize_with = "deserialize_secret")]
    pub client_id: SecretString,

    /// OAuth client secret
    #[serde(deserialize_with = "deserialize_secret")]
    pub client_secret: SecretString,

    /// Previously issued bearer token
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub bearer_token: Option<SecretString>,

    /// API root; sales are read from `{base_url}/sales`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// OAuth token endpoint
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Secret store entry the bearer token is written to
    #[serde(default = "default_token_secret_name")]
    pub token_secret_name: String,

    /// Rows requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Total page requests per fetch, including the first one
    #[serde(default = "default_max_page_fetches")]
    pub max_page_fetches: u32,

    /// Fail on malformed pages instead of skipping them
    #[serde(default)]
    pub strict: bool,

    /// Transport retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Optional client-side request pacing
    #[serde(default)]
    pub requests_per_second: Option<u32>,
}

fn default_base_url() -> String {
    "https://ringside.seatgeek.com/v1".to_string()
}

fn default_auth_url() -> String {
    "https://auth.seatgeek.com/oauth/token".to_string()
}

fn default_token_secret_name() -> String {
    "seatgeek-fla-bearer-token".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_page_fetches() -> u32 {
    102
}

impl SalesFeedConfig {
    /// Create a config with default endpoints and limits
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self {
            client_id: SecretString::from(client_id.into()),
            client_secret,
            bearer_token: None,
            base_url: default_base_url(),
            auth_url: default_auth_url(),
            token_secret_name: default_token_secret_name(),
            page_size: default_page_size(),
            max_page_fetches: default_max_page_fetches(),
            strict: false,
            retry: RetryConfig::default(),
            requests_per_second: None,
        }
    }

    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_yaml_str(&read_config_file(path.as_ref())?)
    }

    /// Reject settings that cannot produce a working client
    pub fn check(&self) -> Result<()> {
        if self.client_id.expose_secret().trim().is_empty() {
            return Err(Error::config("client_id must not be empty"));
        }
        if self.page_size == 0 {
            return Err(Error::config("page_size must be at least 1"));
        }
        if self.max_page_fetches == 0 {
            return Err(Error::config("max_page_fetches must be at least 1"));
        }
        Url::parse(&self.base_url)?;
        Url::parse(&self.auth_url)?;
        self.retry.check()
    }

    /// HTTP client settings: API root, JSON accept header, retry policy and pacing
    pub fn http_config(&self) -> HttpClientConfig {
        let builder = self
            .retry
            .http_builder()
            .base_url(&self.base_url)
            .header("Accept", "application/json");

        match self.requests_per_second {
            Some(rps) => builder.rate_limit(RateLimiterConfig::per_second(rps)),
            None => builder,
        }
        .build()
    }
}

// ============================================================================
// Retry Policy
// ============================================================================

/// Retry policy for HTTP calls
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff shape
    #[serde(rename = "backoff", default)]
    pub backoff_type: BackoffType,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on any single delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_type: BackoffType::Exponential,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_timeout_secs() -> u64 {
    30
}

impl RetryConfig {
    pub fn check(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config("retry.max_attempts must be at least 1"));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(Error::config(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms",
            ));
        }
        Ok(())
    }

    /// HTTP client settings builder seeded with this policy
    pub fn http_builder(&self) -> HttpClientConfigBuilder {
        HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_attempts(self.max_attempts)
            .backoff(
                self.backoff_type,
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            )
    }
}

// ============================================================================
// File Transfer
// ============================================================================

/// SFTP endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct FileTransferConfig {
    /// Server host name or address
    pub host: String,

    /// Login user
    pub username: String,

    /// Login password
    #[serde(deserialize_with = "deserialize_secret")]
    pub password: SecretString,

    /// File or directory every operation targets
    pub remote_path: String,

    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect and handshake timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Expected server key as an OpenSSH SHA256 fingerprint (`SHA256:...`)
    #[serde(default)]
    pub host_key_fingerprint: Option<String>,
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl FileTransferConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password,
            remote_path: remote_path.into(),
            port: default_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
            host_key_fingerprint: None,
        }
    }

    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_yaml_str(&read_config_file(path.as_ref())?)
    }

    pub fn check(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if self.remote_path.trim().is_empty() {
            return Err(Error::config("remote_path must not be empty"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {e}",
            path.display()
        ))
    })
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn deserialize_optional_secret<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .none_if_empty()
        .map(SecretString::from))
}
