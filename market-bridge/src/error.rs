//! Error types for marketplace adapters.
//!
//! Every adapter operation reports failures through [`AdapterError`], whichever
//! vendor it talks to. Vendor-specific error payloads (Shopify `errors`
//! strings, SP-API `errors[].code`, eBay `errorId`, WooCommerce `code`) are
//! normalized into the same tagged variants.
//!
//! # Error Categories
//!
//! - **Credential Errors** ([`AdapterError::Authentication`]): rejected or expired tokens
//! - **Remote Errors** ([`AdapterError::RemoteApi`], [`AdapterError::VendorException`]):
//!   non-2xx statuses and malformed bodies
//! - **Throttling** ([`AdapterError::RateLimited`], [`AdapterError::CircuitOpen`])
//! - **Local Errors** ([`AdapterError::InvalidConfig`], [`AdapterError::InvalidInput`],
//!   [`AdapterError::TransportError`])
//!
//! # Examples
//!
//! ```
//! use market_bridge::error::{AdapterError, Result};
//!
//! fn parse_quantity(raw: &str) -> Result<u32> {
//!     raw.parse().map_err(|_| AdapterError::InvalidInput(format!("not a quantity: {raw}")))
//! }
//!
//! assert!(parse_quantity("12").is_ok());
//! assert_eq!(parse_quantity("-1").unwrap_err().code(), "invalid_input");
//! ```

use std::{borrow::Cow, time::Duration};

use thiserror::Error;

use crate::vendor::Vendor;

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors that can occur while talking to a marketplace.
///
/// # Error Recovery
///
/// - **Transient errors** ([`HttpError`](Self::HttpError), [`RateLimited`](Self::RateLimited),
///   5xx [`RemoteApi`](Self::RemoteApi)): retry with backoff, see
///   [`reliability::is_retryable`](crate::reliability::is_retryable)
/// - **Credential errors** ([`Authentication`](Self::Authentication)): refresh the token
/// - **Configuration errors** ([`InvalidConfig`](Self::InvalidConfig)): fix the config and rebuild
///   the adapter
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The vendor rejected the supplied credentials (HTTP 401 or 403).
    ///
    /// # Recovery
    ///
    /// Token acquisition happens outside this crate. Mint a fresh access token and
    /// rebuild the adapter with the new credentials.
    #[error("{vendor} authentication failed (status {status}): {message}")]
    Authentication {
        /// Vendor that rejected the request.
        vendor: Vendor,
        /// HTTP status returned.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Non-2xx status without a recognizable vendor error code, or a body that
    /// is not the JSON the endpoint promises.
    ///
    /// `status` is `None` when the status was successful but the body could not
    /// be parsed.
    #[error("{vendor} API error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    RemoteApi {
        /// Vendor that produced the response.
        vendor: Vendor,
        /// HTTP status, if the failure was status-driven.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
    },

    /// The vendor throttled the request (HTTP 429).
    #[error("{vendor} rate limit exceeded")]
    RateLimited {
        /// Vendor that throttled the request.
        vendor: Vendor,
        /// Delay requested through the `Retry-After` header, if any.
        retry_after: Option<Duration>,
    },

    /// The vendor reported a typed API exception.
    ///
    /// This is what SP-API calls an `errors[].code`, eBay an `errorId` and
    /// WooCommerce a `code`. Amazon listing submissions with status `INVALID`
    /// are reported here too.
    #[error("{vendor} API exception {code}: {message}")]
    VendorException {
        /// Vendor that raised the exception.
        vendor: Vendor,
        /// HTTP status of the response carrying the exception.
        status: u16,
        /// Vendor error code.
        code: String,
        /// Vendor error message.
        message: String,
    },

    /// Pagination did not terminate within the configured page budget.
    #[error("{vendor} pagination exceeded {max_pages} pages")]
    PaginationLimit {
        /// Vendor being paged.
        vendor: Vendor,
        /// Configured page budget.
        max_pages: u32,
    },

    /// HTTP request failed before a response was received.
    ///
    /// Wraps [`reqwest::Error`]: timeouts, refused connections, DNS and TLS
    /// failures.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The transport refused to send the request (non-HTTPS URL, loopback host,
    /// header injection).
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Adapter configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Caller input is invalid (for example a non-numeric Shopify inventory item id).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The circuit breaker guarding this vendor is open.
    #[error("Circuit breaker is open")]
    CircuitOpen,

    /// Anything that fits none of the variants above.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AdapterError {
    /// Returns a stable, machine-readable code for this error.
    ///
    /// For [`VendorException`](Self::VendorException) this is the vendor's own
    /// code; every other variant maps to a fixed snake-case string.
    #[must_use]
    pub fn code(&self) -> Cow<'_, str> {
        match self {
            Self::Authentication { .. } => Cow::Borrowed("authentication_error"),
            Self::RemoteApi { .. } => Cow::Borrowed("remote_api_error"),
            Self::RateLimited { .. } => Cow::Borrowed("rate_limited"),
            Self::VendorException { code, .. } => Cow::Borrowed(code.as_str()),
            Self::PaginationLimit { .. } => Cow::Borrowed("pagination_limit"),
            Self::HttpError(_) => Cow::Borrowed("http_error"),
            Self::TransportError(_) => Cow::Borrowed("transport_error"),
            Self::InvalidConfig(_) => Cow::Borrowed("invalid_config"),
            Self::InvalidInput(_) => Cow::Borrowed("invalid_input"),
            Self::CircuitOpen => Cow::Borrowed("circuit_open"),
            Self::Unknown(_) => Cow::Borrowed("unknown"),
        }
    }

    /// Returns the vendor this error originated from, when known.
    #[must_use]
    pub fn vendor(&self) -> Option<Vendor> {
        match self {
            Self::Authentication { vendor, .. }
            | Self::RemoteApi { vendor, .. }
            | Self::RateLimited { vendor, .. }
            | Self::VendorException { vendor, .. }
            | Self::PaginationLimit { vendor, .. } => Some(*vendor),
            _ => None,
        }
    }

    /// Returns the HTTP status that produced this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } | Self::VendorException { status, .. } => {
                Some(*status)
            }
            Self::RemoteApi { status, .. } => *status,
            Self::RateLimited { .. } => Some(429),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
