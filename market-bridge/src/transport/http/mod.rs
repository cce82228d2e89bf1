//! reqwest-backed transport.
//!
//! Refuses to send anything that is not HTTPS or that targets a loopback
//! host, marks credential headers as sensitive so reqwest never prints them,
//! and stops reading a response once it exceeds
//! [`HttpConfig::max_response_bytes`].

use reqwest::{
    Client, Method,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use tokio::time::Instant;
use tracing::instrument;
use url::{Host, Url};

use super::config::{HttpConfig, HttpVersion};
use crate::{
    error::{AdapterError, Result},
    transport::{HttpMethod, RequestContext, Transport, TransportResponse},
};

/// Headers that carry vendor credentials.
const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "x-amz-access-token", "x-shopify-access-token"];

/// Returns `true` if `url` points at this machine.
pub(crate) fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => ip.is_loopback() || ip.is_unspecified(),
        Some(Host::Ipv6(ip)) => ip.is_loopback() || ip.is_unspecified(),
        None => false,
    }
}

fn check_destination(url: &Url) -> Result<()> {
    if url.scheme() != "https" {
        return Err(AdapterError::TransportError(format!(
            "refusing non-HTTPS request to {}",
            url.host_str().unwrap_or_default()
        )));
    }
    if url.host().is_none() {
        return Err(AdapterError::TransportError(format!("URL has no host: {url}")));
    }
    if is_loopback(url) {
        return Err(AdapterError::TransportError(format!(
            "refusing request to loopback host {}",
            url.host_str().unwrap_or_default()
        )));
    }
    Ok(())
}

/// Converts request headers, rejecting names or values with control characters.
fn header_map(ctx: &RequestContext) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(ctx.headers.len() + 1);

    if let Some(content_type) = ctx.content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    for (name, value) in &ctx.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AdapterError::TransportError(format!("invalid header name: {name:?}")))?;
        let mut value = HeaderValue::from_str(value)
            .map_err(|_| AdapterError::TransportError(format!("invalid value for header {name}")))?;
        if SENSITIVE_HEADERS.contains(&name.as_str()) {
            value.set_sensitive(true);
        }
        headers.append(name, value);
    }

    Ok(headers)
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
    }
}

/// Production transport.
///
/// Cloning is cheap: clones share one connection pool, so every adapter built
/// from one configuration reuses the same connections.
///
/// # Examples
///
/// ```
/// use market_bridge::transport::{HttpConfig, HttpTransport, HttpVersion};
///
/// let config = HttpConfig {
///     timeout_secs: 60,
///     http_version: HttpVersion::Http1,
///     ..HttpConfig::default()
/// };
///
/// let transport = HttpTransport::with_config(&config).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    http_version: HttpVersion,
    max_response_bytes: usize,
}

impl HttpTransport {
    /// Creates a transport with [`HttpConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        Self::with_config(&HttpConfig::default())
    }

    /// Creates a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if `config` is invalid, or
    /// [`AdapterError::HttpError`] if the client cannot be built.
    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        config.validate()?;

        let builder = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .https_only(true);

        let builder = match config.http_version {
            HttpVersion::Http1 => builder.http1_only(),
            HttpVersion::Http2 => builder.http2_prior_knowledge(),
            HttpVersion::Auto => builder,
        };

        Ok(Self {
            client: builder.build()?,
            http_version: config.http_version,
            max_response_bytes: config.max_response_bytes,
        })
    }

    async fn read_body(&self, mut response: reqwest::Response) -> Result<Vec<u8>> {
        let limit = self.max_response_bytes;
        let announced = response.content_length().map(usize::try_from);
        if announced.is_some_and(|len| len.map_or(true, |len| len > limit)) {
            return Err(AdapterError::TransportError(format!(
                "response body exceeds {limit} bytes"
            )));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(AdapterError::TransportError(format!(
                    "response body exceeds {limit} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

impl Transport for HttpTransport {
    #[instrument(
        name = "http",
        skip(self, ctx, body),
        fields(%method, host = ctx.url.host_str().unwrap_or_default(), path = ctx.url.path())
    )]
    async fn execute<'a>(
        &'a self,
        method: HttpMethod,
        ctx: RequestContext,
        body: Option<Vec<u8>>,
    ) -> Result<TransportResponse> {
        check_destination(&ctx.url)?;
        let headers = header_map(&ctx)?;

        let mut request = self.client.request(to_reqwest_method(method), ctx.url).headers(headers);
        if let Some(body) = body
            && !body.is_empty()
        {
            request = request.body(body);
        }

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_owned())))
            .collect();
        let body = self.read_body(response).await?;

        tracing::debug!(
            status,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "response received"
        );
        Ok(TransportResponse { status, body, headers })
    }

    fn protocol_name(&self) -> &'static str {
        match self.http_version {
            HttpVersion::Http1 => "http/1.1",
            HttpVersion::Http2 => "http/2",
            HttpVersion::Auto => "http",
        }
    }
}
