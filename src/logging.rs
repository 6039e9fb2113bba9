//! Subscriber setup for binaries and jobs that embed the connectors
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the caller. `init_logging` is the stock setup: fmt output filtered by
//! `RUST_LOG`, with `level` as the fallback directive.

use crate::error::{Error, Result};
use crate::types::LogLevel;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber
///
/// Fails if a global subscriber is already set.
pub fn init_logging(level: LogLevel) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(false)
        .try_init()
        .map_err(|e| Error::config(format!("Failed to install log subscriber: {e}")))
}

fn build_filter(level: LogLevel) -> EnvFilter {
    let level: tracing::Level = level.into();
    EnvFilter::from_default_env().add_directive(level.into())
}
