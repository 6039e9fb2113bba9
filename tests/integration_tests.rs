//! Integration tests using a mock HTTP server and an in-memory remote
//!
//! Tests the full flow: YAML config → token → paged sales → CSV upload → download

use arrow::array::{Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use pipeline_connectors::{
    BackoffType, ColumnSchema, ColumnType, Error, FileSecretStore, FileTransferClient,
    FileTransferConfig, MemoryRemote, RetryConfig, SalesFeedClient, SalesFeedConfig, SecretStore,
    TableSchema,
};
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn sales_yaml(server: &MockServer) -> String {
    format!(
        r"
client_id: pipeline
client_secret: hunter2
base_url: {uri}/v1
auth_url: {uri}/oauth/token
token_secret_name: sales-token
page_size: 2
retry:
  max_attempts: 2
  backoff: constant
  initial_backoff_ms: 1
  max_backoff_ms: 5
",
        uri = server.uri()
    )
}

fn sales_schema() -> TableSchema {
    TableSchema::from_yaml_str(
        r"
name: sales
columns:
  - {name: id, type: integer}
  - {name: event, type: string}
  - {name: transaction_date, type: datetime}
",
    )
    .unwrap()
}

fn sale(id: i64) -> Value {
    json!({
        "_id": id,
        "\"event\"": format!("Event {id}"),
        "transaction_date": "2024-03-01T18:00:00.000000-05:00",
    })
}

fn int_column(batch: &RecordBatch, index: usize) -> Vec<i64> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap()
        .values()
        .to_vec()
}

fn header_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

async fn mount_sales(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-e2e"})))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/sales"))
        .and(query_param_is_missing("cursor"))
        .and(header("Authorization", "Bearer tok-e2e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [sale(1), sale(2)],
            "cursor": "c1",
            "has_more": true,
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/sales"))
        .and(query_param("cursor", "c1"))
        .and(header("Authorization", "Bearer tok-e2e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [sale(3)],
            "cursor": null,
            "has_more": false,
        })))
        .mount(server)
        .await;
}

// ============================================================================
// Sales Feed
// ============================================================================

#[tokio::test]
async fn test_sales_feed_end_to_end() {
    let server = MockServer::start().await;
    mount_sales(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSecretStore::new(dir.path().join("secrets.json")));
    let config = SalesFeedConfig::from_yaml_str(&sales_yaml(&server)).unwrap();

    let mut client = SalesFeedClient::new(config, store.clone())
        .unwrap()
        .with_input_schema(sales_schema());
    client.cache_authentication_token().await.unwrap();

    let report = client.get_sales_pages().await.unwrap();
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_skipped, 0);
    assert!(!report.hit_page_cap);
    assert_eq!(int_column(&report.batch, 0), vec![1, 2, 3]);

    let names: Vec<&str> = report
        .batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    assert_eq!(names, vec!["id", "event", "transaction_date"]);

    let saved = store.load("sales-token").await.unwrap().unwrap();
    assert_eq!(saved.expose_secret(), "tok-e2e");
}

#[tokio::test]
async fn test_sales_token_restored_by_new_client() {
    let server = MockServer::start().await;
    mount_sales(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let secrets = dir.path().join("secrets.json");
    let yaml = sales_yaml(&server);

    let mut first = SalesFeedClient::new(
        SalesFeedConfig::from_yaml_str(&yaml).unwrap(),
        Arc::new(FileSecretStore::new(&secrets)),
    )
    .unwrap();
    first.cache_authentication_token().await.unwrap();

    // A second process picks the token up from the same file
    let mut second = SalesFeedClient::new(
        SalesFeedConfig::from_yaml_str(&yaml).unwrap(),
        Arc::new(FileSecretStore::new(&secrets)),
    )
    .unwrap()
    .with_input_schema(sales_schema());
    assert!(!second.has_bearer_token());
    assert!(second.restore_authentication_token().await.unwrap());

    let batch = second.get_sales().await.unwrap();
    assert_eq!(batch.num_rows(), 3);
}

// ============================================================================
// File Transfer
// ============================================================================

#[tokio::test]
async fn test_sales_upload_and_download_round_trip() {
    let server = MockServer::start().await;
    mount_sales(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSecretStore::new(dir.path().join("secrets.json")));
    let mut sales = SalesFeedClient::new(
        SalesFeedConfig::from_yaml_str(&sales_yaml(&server)).unwrap(),
        store,
    )
    .unwrap()
    .with_input_schema(sales_schema());
    sales.cache_authentication_token().await.unwrap();
    let batch = sales.get_sales().await.unwrap();

    let remote = MemoryRemote::new();
    let outbound = FileTransferClient::with_opener("/outbound/sales.csv", Arc::new(remote.clone()))
        .with_output_schema(sales_schema());
    assert!(!outbound.file_exists().await.unwrap());

    outbound.upload_csv(&batch).await.unwrap();
    assert!(outbound.file_exists().await.unwrap());

    let written = remote.get("/outbound/sales.csv").unwrap();
    assert_eq!(
        header_line(&written),
        "id,event,transaction_date,processed_date"
    );

    let inbound = FileTransferClient::with_opener("/outbound/sales.csv", Arc::new(remote.clone()))
        .with_input_schema(TableSchema::new(vec![
            ColumnSchema::new("event", ColumnType::String),
            ColumnSchema::new("id", ColumnType::Integer),
        ]));
    let downloaded = inbound.download_csv(b',').await.unwrap();

    assert_eq!(downloaded.num_rows(), 3);
    assert_eq!(int_column(&downloaded, 1), vec![1, 2, 3]);
    let events = downloaded
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(events.value(2), "Event 3");

    let listing = FileTransferClient::with_opener("/outbound", Arc::new(remote.clone()));
    assert_eq!(listing.list_filenames().await.unwrap(), vec!["sales.csv"]);

    assert_eq!(remote.sessions_opened(), remote.sessions_closed());
}

#[tokio::test]
async fn test_download_file_keeps_extension() {
    let remote = MemoryRemote::new();
    remote.insert("/drop/report.xlsx", b"binary".to_vec());
    let client = FileTransferClient::with_opener("/drop/report.xlsx", Arc::new(remote.clone()));

    let dir = tempfile::tempdir().unwrap();
    let local = client.download_file_to(dir.path(), "latest").await.unwrap();

    assert_eq!(local, dir.path().join("latest.xlsx"));
    assert_eq!(std::fs::read(&local).unwrap(), b"binary");
}

#[tokio::test]
async fn test_missing_remote_file() {
    let remote = MemoryRemote::new();
    let client = FileTransferClient::with_opener("/drop/none.csv", Arc::new(remote.clone()));

    assert!(!client.file_exists().await.unwrap());
    assert_eq!(client.download_csv(b',').await.unwrap().num_columns(), 0);

    let dir = tempfile::tempdir().unwrap();
    let err = client.download_file_to(dir.path(), "x").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(remote.sessions_opened(), remote.sessions_closed());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_load_configs_from_files() {
    let dir = tempfile::tempdir().unwrap();

    let sales_path = dir.path().join("sales.yaml");
    std::fs::write(
        &sales_path,
        "client_id: pipeline\nclient_secret: s3cr3t\nretry:\n  backoff: linear\n",
    )
    .unwrap();
    let sales = SalesFeedConfig::load(&sales_path).unwrap();
    assert_eq!(sales.page_size, 100);
    assert_eq!(sales.max_page_fetches, 102);
    assert_eq!(sales.retry.backoff_type, BackoffType::Linear);
    assert_eq!(sales.client_secret.expose_secret(), "s3cr3t");
    assert!(!format!("{sales:?}").contains("s3cr3t"));

    let sftp_path = dir.path().join("sftp.yaml");
    std::fs::write(
        &sftp_path,
        "host: sftp.example.com\nusername: etl\npassword: pw\nremote_path: /in/data.csv\n",
    )
    .unwrap();
    let sftp = FileTransferConfig::load(&sftp_path).unwrap();
    assert_eq!(sftp.port, 22);
    assert_eq!(sftp.remote_path, "/in/data.csv");
    assert!(FileTransferClient::new(sftp).is_ok());
}

#[test]
fn test_invalid_config_rejected() {
    let err = SalesFeedConfig::from_yaml_str("client_id: ''\nclient_secret: x\n").unwrap_err();
    assert!(matches!(err, Error::Config { .. }));

    let retry = RetryConfig {
        max_attempts: 0,
        ..RetryConfig::default()
    };
    assert!(retry.check().is_err());
}
