//! Tests for the HTTP client module

use super::*;
use crate::error::Error;
use crate::types::BackoffType;
use reqwest::Method;
use secrecy::SecretString;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(base: &str) -> HttpClientConfig {
    HttpClientConfig::builder()
        .base_url(base)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(5),
            Duration::from_secs(1),
        )
        .build()
}

fn fast_client(server: &MockServer) -> HttpClient {
    HttpClient::with_config(fast_config(&server.uri())).unwrap()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.initial_backoff, Duration::from_millis(500));
    assert_eq!(config.backoff_type, BackoffType::Exponential);
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_none());
    assert!(config.user_agent.starts_with("pipeline-connectors/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.example.com")
        .timeout(Duration::from_secs(60))
        .max_attempts(3)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .header("Accept", "application/json")
        .rate_limit(RateLimiterConfig::per_second(2))
        .build();

    assert_eq!(config.base_url, Some("https://api.example.com".to_string()));
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_attempts, 3);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(
        config.default_headers.get("Accept"),
        Some(&"application/json".to_string())
    );
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::per_second(2)));
}

#[test]
fn test_request_config_builder() {
    let token = SecretString::from("tok".to_string());
    let config = RequestConfig::new()
        .query("limit", "100")
        .header("X-Request-Id", "abc123")
        .json(serde_json::json!({"key": "value"}))
        .bearer(&token);

    assert_eq!(config.query.get("limit"), Some(&"100".to_string()));
    assert_eq!(
        config.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert!(config.body.is_some());
    assert!(config.bearer.is_some());
}

#[tokio::test]
async fn test_send_bearer_query_and_default_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/sales"))
        .and(header("Authorization", "Bearer secret-token"))
        .and(header("Accept", "application/json"))
        .and(query_param("limit", "100"))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = fast_config(&mock_server.uri());
    config
        .default_headers
        .insert("Accept".to_string(), "application/json".to_string());
    let client = HttpClient::with_config(config).unwrap();

    let token = SecretString::from("secret-token".to_string());
    let response = client
        .send(
            Method::GET,
            "/v1/sales",
            RequestConfig::new()
                .query("limit", "100")
                .query("cursor", "c1")
                .bearer(&token),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_request_posts_json_to_absolute_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_json(serde_json::json!({"grant_type": "client_credentials"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "abc"
        })))
        .mount(&mock_server)
        .await;

    // The base URL points elsewhere; an absolute URL wins
    let client = HttpClient::with_config(fast_config("http://127.0.0.1:1/v1")).unwrap();
    let response = client
        .request(
            Method::POST,
            &format!("{}/oauth/token", mock_server.uri()),
            RequestConfig::new().json(serde_json::json!({"grant_type": "client_credentials"})),
        )
        .await
        .unwrap();

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["access_token"], "abc");
}

#[tokio::test]
async fn test_send_returns_non_success_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server);
    let response = client
        .send(Method::GET, "/api/forbidden", RequestConfig::new())
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_request_hands_back_client_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server);
    let response = client
        .request(Method::GET, "/api/missing", RequestConfig::new())
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_http_client_retry_on_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server);
    let response = client
        .request(Method::GET, "/api/flaky", RequestConfig::new())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_http_client_rate_limit_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server);
    let response = client
        .send(Method::GET, "/api/limited", RequestConfig::new())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_send_returns_last_response_when_budget_runs_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/always-fail"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(5)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server);
    let response = client
        .send(Method::GET, "/api/always-fail", RequestConfig::new())
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_request_exhausted_retryable_status_is_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = fast_config(&mock_server.uri());
    config.max_attempts = 3;
    let client = HttpClient::with_config(config).unwrap();

    let err = client
        .request(Method::POST, "/oauth/token", RequestConfig::new())
        .await
        .unwrap_err();

    match err {
        Error::Transport { attempts, message } => {
            assert_eq!(attempts, 3);
            assert!(message.contains("503"));
            assert!(message.contains("upstream unavailable"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_becomes_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = HttpClientConfig::builder()
        .base_url(format!("http://{addr}"))
        .max_attempts(3)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let err = client
        .send(Method::GET, "/v1/sales", RequestConfig::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { attempts: 3, .. }));
}

#[test]
fn test_calculate_backoff_constant() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(5), Duration::from_millis(100));
}

#[test]
fn test_calculate_backoff_linear() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(300));
}

#[test]
fn test_default_backoff_matches_half_second_exponential() {
    let client = HttpClient::with_config(HttpClientConfig::default()).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(500));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(1000));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(2000));
    assert_eq!(client.calculate_backoff(3), Duration::from_millis(4000));
}

#[test]
fn test_calculate_backoff_respects_max() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_millis(500),
        )
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(10), Duration::from_millis(500));
    assert_eq!(client.calculate_backoff(40), Duration::from_millis(500));
}

#[test]
fn test_http_client_debug() {
    let config = HttpClientConfig::builder()
        .rate_limit(RateLimiterConfig::per_second(1))
        .build();
    let client = HttpClient::with_config(config).unwrap();
    let debug_str = format!("{client:?}");
    assert!(debug_str.contains("HttpClient"));
    assert!(debug_str.contains("has_rate_limiter: true"));
}
