//! HTTP client module
//!
//! Provides the HTTP transport with retry, rate limiting, and backoff.
//!
//! # Features
//!
//! - **Automatic Retries**: fixed attempt budget per call with backoff
//! - **Rate Limiting**: optional token bucket limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Bearer Auth**: per-request tokens held as secrets

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
