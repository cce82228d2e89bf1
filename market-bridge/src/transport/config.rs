//! `[transport]` settings.
//!
//! Every field has a default, so an empty table is valid.
//!
//! ```toml
//! [transport]
//! timeout_secs = 20
//! connect_timeout_secs = 5
//! http_version = "http1"
//! user_agent = "inventory-sync/2.1 (Language=Rust)"
//! max_response_bytes = 16777216
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::{AdapterError, Result};

fn default_pool_max_idle() -> usize {
    16
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("market-bridge/", env!("CARGO_PKG_VERSION"), " (Language=Rust)").to_owned()
}

fn default_max_response_bytes() -> usize {
    32 * 1024 * 1024
}

/// Settings of the shared [`HttpTransport`](super::HttpTransport).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    /// Idle connections kept per vendor host (default: 16).
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    /// Whole-request timeout in seconds, 1 to 300 (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds, 1 to 60 (default: 10).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// HTTP version preference (default: auto).
    #[serde(default)]
    pub http_version: HttpVersion,

    /// `User-Agent` sent with every request.
    ///
    /// Amazon asks SP-API callers to identify their application here.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Largest response body accepted, in bytes (default: 32 MiB).
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: default_pool_max_idle(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            http_version: HttpVersion::default(),
            user_agent: default_user_agent(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl HttpConfig {
    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if a timeout is out of range,
    /// the user agent is blank or contains control characters, or the
    /// response limit is zero.
    pub fn validate(&self) -> Result<()> {
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(AdapterError::InvalidConfig(
                "transport timeout_secs must be between 1 and 300".to_owned(),
            ));
        }
        if !(1..=60).contains(&self.connect_timeout_secs) {
            return Err(AdapterError::InvalidConfig(
                "transport connect_timeout_secs must be between 1 and 60".to_owned(),
            ));
        }
        if self.user_agent.trim().is_empty() || self.user_agent.chars().any(char::is_control) {
            return Err(AdapterError::InvalidConfig(
                "transport user_agent must be non-empty printable text".to_owned(),
            ));
        }
        if self.max_response_bytes == 0 {
            return Err(AdapterError::InvalidConfig(
                "transport max_response_bytes must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Whole-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// HTTP version preference.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HttpVersion {
    /// HTTP/1.1 only.
    Http1,
    /// HTTP/2 only (prior knowledge).
    Http2,
    /// Negotiated through ALPN.
    #[default]
    Auto,
}
