//! Sales feed client
//!
//! Owns one HTTP client, the held bearer token and the optional input schema.
//! Calls are sequential; each fetch walks the pages one request at a time.

use super::normalize::normalize_record;
use crate::config::SalesFeedConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::pagination::{CursorPaginator, NextPage, PaginationState, StopReason};
use crate::schema::TableSchema;
use crate::secrets::SecretStore;
use crate::table::concat;
use crate::types::JsonObject;
use arrow::record_batch::RecordBatch;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SALES_PATH: &str = "sales";

/// Outcome of one paginated fetch
#[derive(Debug, Clone)]
pub struct SalesFetchReport {
    /// Validated rows of every accepted page, in page order
    pub batch: RecordBatch,
    /// Requests issued
    pub pages_fetched: u32,
    /// Pages whose rows were dropped (failed request, unreadable body, bad rows)
    pub pages_skipped: u32,
    /// Whether the request ceiling ended the fetch
    pub hit_page_cap: bool,
    /// Why pagination ended
    pub stop_reason: Option<StopReason>,
}

/// Client for the sales REST API
pub struct SalesFeedClient {
    config: SalesFeedConfig,
    http: HttpClient,
    secrets: Arc<dyn SecretStore>,
    input_schema: Option<TableSchema>,
    bearer_token: Option<SecretString>,
    paginator: CursorPaginator,
}

impl SalesFeedClient {
    /// Create a client; the bearer token from the config, if any, is held
    pub fn new(config: SalesFeedConfig, secrets: Arc<dyn SecretStore>) -> Result<Self> {
        config.check()?;

        let http = HttpClient::with_config(config.http_config())?;

        let paginator = CursorPaginator::new(config.page_size, config.max_page_fetches);
        let bearer_token = config.bearer_token.clone();

        Ok(Self {
            config,
            http,
            secrets,
            input_schema: None,
            bearer_token,
            paginator,
        })
    }

    /// Validate fetched rows against `schema`
    #[must_use]
    pub fn with_input_schema(mut self, schema: TableSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Use `token` for subsequent requests
    #[must_use]
    pub fn with_bearer_token(mut self, token: SecretString) -> Self {
        self.bearer_token = Some(token);
        self
    }

    pub fn set_input_schema(&mut self, schema: Option<TableSchema>) {
        self.input_schema = schema;
    }

    pub fn set_bearer_token(&mut self, token: SecretString) {
        self.bearer_token = Some(token);
    }

    pub fn config(&self) -> &SalesFeedConfig {
        &self.config
    }

    pub fn input_schema(&self) -> Option<&TableSchema> {
        self.input_schema.as_ref()
    }

    pub fn has_bearer_token(&self) -> bool {
        self.bearer_token.is_some()
    }

    /// OAuth audience: the base URL without its last path segment
    pub fn audience(&self) -> String {
        audience_for(&self.config.base_url)
    }

    /// Request a bearer token and persist it to the secret store
    ///
    /// The stored entry is overwritten and the new token is held by this
    /// client for later fetches.
    pub async fn cache_authentication_token(&mut self) -> Result<()> {
        let payload = json!({
            "client_id": self.config.client_id.expose_secret(),
            "client_secret": self.config.client_secret.expose_secret(),
            "audience": self.audience(),
            "grant_type": "client_credentials",
        });

        let request = RequestConfig::new()
            .header("Content-Type", "application/json")
            .json(payload);

        let response = self
            .http
            .request(Method::POST, &self.config.auth_url, request)
            .await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(1, format!("Failed to read token response: {e}")))?;

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            Error::decode(format!(
                "Token response (status {}) is not JSON: {e}",
                status.as_u16()
            ))
        })?;

        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::missing_field(
                    "access_token",
                    format!("token response (status {})", status.as_u16()),
                )
            })?;
        let token = SecretString::from(token.to_string());

        let name = &self.config.token_secret_name;
        self.secrets.save(name, &token, true).await?;
        self.bearer_token = Some(token);

        info!("Saved bearer token to secret {}", name);
        Ok(())
    }

    /// Load a previously cached token from the secret store
    ///
    /// Returns whether a token was found.
    pub async fn restore_authentication_token(&mut self) -> Result<bool> {
        match self.secrets.load(&self.config.token_secret_name).await? {
            Some(token) => {
                self.bearer_token = Some(token);
                debug!(
                    "Loaded bearer token from secret {}",
                    self.config.token_secret_name
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fetch every page of sales and return the validated rows
    pub async fn get_sales(&self) -> Result<RecordBatch> {
        Ok(self.get_sales_pages().await?.batch)
    }

    /// Fetch every page of sales, reporting how pagination went
    pub async fn get_sales_pages(&self) -> Result<SalesFetchReport> {
        let schema = self
            .input_schema
            .as_ref()
            .ok_or_else(|| Error::config("Fetching sales requires an input schema"))?;
        let token = self.bearer_token.as_ref().ok_or_else(|| {
            Error::auth("No bearer token; cache or configure one before fetching sales")
        })?;

        let strict = self.config.strict;
        let mut state = PaginationState::new();
        let mut batches = Vec::new();
        let mut pages_skipped = 0u32;

        while self.paginator.can_fetch(&state) {
            let mut request = RequestConfig::new().bearer(token);
            for (key, value) in self.paginator.request_params(&state) {
                request = request.query(key, value);
            }

            state.record_request();
            let page = state.pages_fetched;

            let response = self.http.send(Method::GET, SALES_PATH, request).await?;
            let status = response.status();

            if status != StatusCode::OK {
                warn!(
                    "Sales page {} returned status {}, stopping pagination",
                    page,
                    status.as_u16()
                );
                pages_skipped += 1;
                self.paginator.fail(&mut state);
                break;
            }

            let text = response
                .text()
                .await
                .map_err(|e| Error::transport(1, format!("Failed to read sales page {page}: {e}")))?;

            let body: Value = match serde_json::from_str(&text) {
                Ok(body) => body,
                Err(e) if strict => {
                    return Err(Error::decode(format!("Sales page {page} is not JSON: {e}")));
                }
                Err(e) => {
                    warn!("Sales page {} is not JSON ({}), stopping pagination", page, e);
                    pages_skipped += 1;
                    self.paginator.fail(&mut state);
                    break;
                }
            };

            let accepted = match page_batch(&body, schema, page) {
                Ok(batch) => {
                    let rows = batch.num_rows();
                    debug!("Sales page {}: {} row(s)", page, rows);
                    batches.push(batch);
                    rows
                }
                Err(e) if strict => return Err(e),
                Err(e) => {
                    warn!("Skipping rows of sales page {}: {}", page, e);
                    pages_skipped += 1;
                    0
                }
            };

            if let NextPage::Done(reason) = self.paginator.process_page(&body, accepted, &mut state)
            {
                match reason {
                    StopReason::MissingHasMore if strict => {
                        return Err(Error::missing_field("has_more", format!("sales page {page}")));
                    }
                    StopReason::MissingCursor if strict => {
                        return Err(Error::missing_field("cursor", format!("sales page {page}")));
                    }
                    StopReason::PageCap => {
                        info!(
                            "Reached the limit of {} sales page requests, stopping",
                            self.config.max_page_fetches
                        );
                    }
                    reason if reason.is_degraded() => {
                        warn!("Sales page {}: {}, stopping pagination", page, reason);
                    }
                    _ => {}
                }
            }
        }

        let batch = concat(&schema.arrow_schema(), &batches)?;
        info!(
            "Fetched {} sales row(s) over {} page request(s), {} skipped",
            batch.num_rows(),
            state.pages_fetched,
            pages_skipped
        );

        Ok(SalesFetchReport {
            batch,
            pages_fetched: state.pages_fetched,
            pages_skipped,
            hit_page_cap: state.stop_reason == Some(StopReason::PageCap),
            stop_reason: state.stop_reason,
        })
    }
}

impl std::fmt::Debug for SalesFeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesFeedClient")
            .field("config", &self.config)
            .field("input_schema", &self.input_schema.as_ref().map(TableSchema::display_name))
            .field("has_bearer_token", &self.bearer_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Base URL with its last `/`-separated segment removed
pub(crate) fn audience_for(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(head, _)| head.to_string())
        .unwrap_or_default()
}

/// Normalize and validate the `data` rows of one page
fn page_batch(body: &Value, schema: &TableSchema, page: u32) -> Result<RecordBatch> {
    let context = || format!("sales page {page}");

    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::missing_field("data", context()))?;

    let rows = data
        .iter()
        .map(|row| {
            row.as_object()
                .map(normalize_record)
                .ok_or_else(|| Error::decode(format!("{}: row is not an object: {row}", context())))
        })
        .collect::<Result<Vec<JsonObject>>>()?;

    schema.validate_records(&rows)
}
