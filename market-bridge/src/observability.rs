//! Structured logging setup.
//!
//! Adapters only emit `tracing` events. Installing a subscriber is left to the
//! application, and [`init_observability`] is the stock way to do it.

use std::io;

use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, MakeWriter, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{AdapterError, Result};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

impl LogFormat {
    /// Reads the format from `LOG_FORMAT`.
    ///
    /// `json` selects [`LogFormat::Json`]; anything else, or an unset
    /// variable, selects [`LogFormat::Pretty`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") { Self::Json } else { Self::Pretty }
    }
}

/// Installs the global tracing subscriber.
///
/// Events go to stderr. The level filter comes from `RUST_LOG` and defaults
/// to `info`. Span close events are logged so every adapter call carries its
/// duration.
///
/// # Errors
///
/// Returns [`AdapterError::InvalidConfig`] if a global subscriber is already
/// installed.
///
/// # Examples
///
/// ```no_run
/// use market_bridge::observability::{LogFormat, init_observability};
///
/// init_observability(LogFormat::from_env()).unwrap();
/// ```
pub fn init_observability(format: LogFormat) -> Result<()> {
    subscriber(format, io::stderr)
        .try_init()
        .map_err(|e| AdapterError::InvalidConfig(format!("cannot install logger: {e}")))
}

fn subscriber<W>(format: LogFormat, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => Box::new(
            registry.with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(writer),
            ),
        ),
        LogFormat::Json => Box::new(
            registry.with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(writer),
            ),
        ),
    }
}
