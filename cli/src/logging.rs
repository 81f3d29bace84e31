// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tracing subscriber setup. `RUST_LOG` wins over the configured level.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// Unknown values fall back to compact output.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}

pub fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to create log filter")
}

/// Initialize tracing subscriber for logging
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = build_filter(level)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = match format {
        LogFormat::Compact => builder.with_target(false).compact().try_init(),
        LogFormat::Json => builder.with_target(true).json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))
}

/// Run `f` under a temporary compact subscriber. Used while the config file
/// that decides the real logging setup is still being loaded.
pub fn with_bootstrap_logging<T>(level: &str, f: impl FnOnce() -> T) -> T {
    match build_filter(level) {
        Ok(filter) => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .compact()
                .finish();
            tracing::subscriber::with_default(subscriber, f)
        }
        Err(_) => f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Compact);
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(build_filter("info").is_ok());
        assert!(build_filter("taskhub=verbose").is_err());
    }

    #[test]
    fn test_bootstrap_logging_returns_closure_result() {
        let value = with_bootstrap_logging("info", || {
            tracing::info!("loading configuration");
            41 + 1
        });
        assert_eq!(value, 42);

        if std::env::var("RUST_LOG").is_err() {
            assert!(with_bootstrap_logging("info", || tracing::enabled!(tracing::Level::INFO)));
        }
        assert_eq!(with_bootstrap_logging("taskhub=verbose", || 7), 7);
    }
}
