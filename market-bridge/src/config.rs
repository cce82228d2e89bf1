//! Adapter configuration file.
//!
//! One TOML document describes the shared HTTP transport, the request
//! policies and one `[[vendors]]` entry per marketplace account:
//!
//! ```toml
//! [transport]
//! timeout_secs = 30
//!
//! [retry]
//! max_attempts = 3
//!
//! [circuit_breaker]
//! failure_threshold = 5
//!
//! [pagination]
//! max_pages = 50
//!
//! [[vendors]]
//! vendor = "shopify"
//! store_name = "demo"
//! access_token = { env = "SHOPIFY_ACCESS_TOKEN" }
//!
//! [[vendors]]
//! vendor = "woocommerce"
//! store_url = "https://yourstore.com"
//! consumer_key = { env = "WC_CONSUMER_KEY" }
//! consumer_secret = { env = "WC_CONSUMER_SECRET" }
//! ```
//!
//! Every table is optional. Without `[retry]` adapters make one attempt per
//! request, and without `[circuit_breaker]` no breaker is installed.

use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::{
    credentials::VendorCredentials,
    error::{AdapterError, Result},
    reliability::{CircuitBreakerConfig, RetryPolicy},
    transport::{HttpConfig, HttpTransport, Transport},
    vendor::{ClientOptions, Marketplace, PaginationConfig},
};

/// Root adapter configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdaptersConfig {
    /// HTTP transport settings shared by every adapter.
    #[serde(default)]
    pub transport: HttpConfig,

    /// Retry policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Circuit breaker, disabled when absent.
    #[serde(default)]
    pub circuit_breaker: Option<BreakerConfig>,

    /// Pagination limits.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Marketplace accounts, in the order adapters are built.
    #[serde(default)]
    pub vendors: Vec<VendorCredentials>,
}

impl AdaptersConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if the document does not parse,
    /// references an unset environment variable, or fails validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use market_bridge::{Vendor, config::AdaptersConfig};
    ///
    /// let config = AdaptersConfig::from_toml(r#"
    ///     [[vendors]]
    ///     vendor = "ebay"
    ///     access_token = "v^1.1#i^1"
    /// "#).unwrap();
    ///
    /// assert_eq!(config.vendors[0].vendor(), Vendor::Ebay);
    /// ```
    pub fn from_toml(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document)
            .map_err(|e| AdapterError::InvalidConfig(format!("invalid adapter config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if the file cannot be read or
    /// [`from_toml`](Self::from_toml) fails.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|e| {
            AdapterError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&document)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.transport.validate()?;
        self.retry.validate()?;
        if let Some(breaker) = &self.circuit_breaker {
            breaker.validate()?;
        }
        self.pagination.validate()?;
        for (index, vendor) in self.vendors.iter().enumerate() {
            vendor.validate().map_err(|e| match e {
                AdapterError::InvalidConfig(message) => {
                    AdapterError::InvalidConfig(format!("vendors[{index}]: {message}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// Request policies derived from this configuration.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            retry: self.retry.to_policy(),
            circuit_breaker: self.circuit_breaker.as_ref().map(BreakerConfig::to_breaker_config),
            pagination: self.pagination,
        }
    }

    /// Builds one adapter per vendor entry over a shared [`HttpTransport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created or an entry is invalid.
    pub fn build(&self) -> Result<Vec<Marketplace<HttpTransport>>> {
        let transport = HttpTransport::with_config(&self.transport)?;
        self.build_with(&transport)
    }

    /// Builds one adapter per vendor entry, each with a clone of `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if an entry is invalid.
    pub fn build_with<T: Transport + Clone>(&self, transport: &T) -> Result<Vec<Marketplace<T>>> {
        let options = self.client_options();
        let adapters = self
            .vendors
            .iter()
            .map(|credentials| Marketplace::new(credentials.clone(), transport.clone(), &options))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            adapters = adapters.len(),
            retry_attempts = options.retry.max_attempts,
            circuit_breaker = options.circuit_breaker.is_some(),
            "marketplace adapters built"
        );
        Ok(adapters)
    }
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

/// `[retry]` table, converted to a [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetryConfig {
    /// Attempts per request, the first one included (default: 1).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds (default: 100).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on the delay in milliseconds (default: 5000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Delay growth factor (default: 2.0).
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Validates the retry settings.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if `max_attempts` is zero, the
    /// multiplier is below 1, or the initial delay exceeds the maximum.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AdapterError::InvalidConfig("retry max_attempts must be at least 1".to_owned()));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(AdapterError::InvalidConfig(
                "retry backoff_multiplier must be a finite number >= 1.0".to_owned(),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(AdapterError::InvalidConfig(
                "retry initial_delay_ms cannot exceed max_delay_ms".to_owned(),
            ));
        }
        Ok(())
    }

    /// Converts to the runtime policy.
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

fn default_failure_threshold() -> u64 {
    5
}

fn default_success_threshold() -> u64 {
    2
}

fn default_reset_timeout_secs() -> u64 {
    60
}

/// Longest open period accepted from configuration: one day.
const MAX_RESET_TIMEOUT_SECS: u64 = 86_400;

/// `[circuit_breaker]` table, converted to a [`CircuitBreakerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit (default: 5).
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u64,

    /// Consecutive half-open successes that close it again (default: 2).
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u64,

    /// Seconds spent open before a probe is let through, 1 to 86400 (default: 60).
    #[serde(default = "default_reset_timeout_secs")]
    pub reset_timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            reset_timeout_secs: default_reset_timeout_secs(),
        }
    }
}

impl BreakerConfig {
    /// Validates the breaker thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if a threshold is zero or the
    /// reset timeout is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.failure_threshold == 0 || self.success_threshold == 0 {
            return Err(AdapterError::InvalidConfig(
                "circuit_breaker thresholds must be at least 1".to_owned(),
            ));
        }
        if !(1..=MAX_RESET_TIMEOUT_SECS).contains(&self.reset_timeout_secs) {
            return Err(AdapterError::InvalidConfig(format!(
                "circuit_breaker reset_timeout_secs must be between 1 and {MAX_RESET_TIMEOUT_SECS}"
            )));
        }
        Ok(())
    }

    /// Converts to the runtime breaker settings.
    #[must_use]
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            reset_timeout: Duration::from_secs(self.reset_timeout_secs),
        }
    }
}
