//! Transport abstraction layer.
//!
//! Adapters never talk to `reqwest` directly. They describe a request with a
//! [`RequestContext`] and hand it to a [`Transport`], which returns the raw
//! status, headers and body. Classifying the status and parsing the body is
//! the adapter's job, so a transport must return non-2xx responses as `Ok`.
//!
//! The trait is open: callers can plug in their own transport (a proxy, a
//! recording layer, a test double) as long as it honours that contract.
//!
//! # Examples
//!
//! ```rust,no_run
//! use market_bridge::transport::{HttpTransport, RequestContext, Transport};
//! use url::Url;
//!
//! # async fn example() -> market_bridge::error::Result<()> {
//! let transport = HttpTransport::new()?;
//!
//! let ctx = RequestContext::new(Url::parse("https://demo.myshopify.com/admin/api/2024-01/products.json").unwrap())
//!     .with_header("X-Shopify-Access-Token", "shpat_example");
//!
//! let response = transport.get(ctx).await?;
//! println!("Status: {}", response.status);
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;
use std::{fmt, sync::Arc};

use url::Url;

use crate::error::Result;

pub mod config;
pub mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use config::{HttpConfig, HttpVersion};
pub use http::HttpTransport;

/// HTTP method of a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request description handed to a [`Transport`].
///
/// The URL is absolute and already carries its query string, which lets
/// adapters follow `next` links returned by the vendor verbatim.
#[derive(Clone)]
pub struct RequestContext {
    /// Absolute request URL including query.
    pub url: Url,
    /// Additional HTTP headers to include.
    pub headers: Vec<(String, String)>,
    /// Content-Type header value (if applicable).
    pub content_type: Option<&'static str>,
}

impl RequestContext {
    /// Creates a context for `url` with no extra headers.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url, headers: Vec::new(), content_type: None }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Marks the body as JSON.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.content_type = Some("application/json");
        self
    }

    /// Returns the value of the first header named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

// Header values carry credentials, so only header names are printed.
impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("RequestContext")
            .field("url", &self.url.as_str())
            .field("headers", &names)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Response from transport operations.
///
/// Contains the raw response body, HTTP status code, and response headers.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body bytes.
    pub body: Vec<u8>,
    /// Response headers.
    pub headers: Vec<(String, String)>,
}

impl TransportResponse {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the value of the first header named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Transport protocol abstraction.
///
/// Implementations perform exactly one network exchange per
/// [`execute`](Self::execute) call. Retries and circuit breaking are layered
/// on top by [`VendorClient`](crate::vendor::client::VendorClient), never
/// inside a transport.
///
/// # Contract
///
/// - Non-2xx responses are returned as `Ok(TransportResponse)`.
/// - `Err` is reserved for failures where no response exists (connect errors,
///   timeouts, rejected URLs).
pub trait Transport: Send + Sync {
    /// Executes a request.
    ///
    /// # Errors
    ///
    /// Returns error if the request could not be sent or no response was received.
    fn execute<'a>(
        &'a self,
        method: HttpMethod,
        ctx: RequestContext,
        body: Option<Vec<u8>>,
    ) -> impl Future<Output = Result<TransportResponse>> + Send + 'a;

    /// Executes a GET request.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    fn get(&self, ctx: RequestContext) -> impl Future<Output = Result<TransportResponse>> + Send {
        self.execute(HttpMethod::Get, ctx, None)
    }

    /// Returns the protocol name for logging.
    ///
    /// Examples: "http/1.1", "http/2", "mock"
    fn protocol_name(&self) -> &'static str;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute<'a>(
        &'a self,
        method: HttpMethod,
        ctx: RequestContext,
        body: Option<Vec<u8>>,
    ) -> impl Future<Output = Result<TransportResponse>> + Send + 'a {
        (**self).execute(method, ctx, body)
    }

    fn protocol_name(&self) -> &'static str {
        (**self).protocol_name()
    }
}
