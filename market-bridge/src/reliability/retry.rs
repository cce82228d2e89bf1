//! Exponential backoff for transient vendor failures.
//!
//! Adapters do not retry by default: [`RetryPolicy::default`] makes a single
//! attempt, so a stock update is never sent twice unless the caller asks for
//! it. When retries are enabled, [`retry_decision`] picks which errors are
//! worth another attempt and how long to wait, honouring a vendor's
//! `Retry-After` header when it sent one.

use std::time::Duration;

use crate::AdapterError;

/// Attempt budget and backoff curve.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use market_bridge::reliability::RetryPolicy;
///
/// assert_eq!(RetryPolicy::default().max_attempts, 1);
///
/// let sync_job = RetryPolicy {
///     max_attempts: 4,
///     initial_delay: Duration::from_millis(250),
///     max_delay: Duration::from_secs(10),
///     backoff_multiplier: 2.0,
/// };
/// assert_eq!(sync_job.delay_for_attempt(2), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per request, the first one included (default: 1).
    pub max_attempts: u32,
    /// Delay before the first retry (default: 100ms).
    pub initial_delay: Duration,
    /// Longest delay between two attempts (default: 5s).
    ///
    /// Also the longest `Retry-After` the policy is willing to wait for.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays (default: 2.0).
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default curve with `max_attempts` attempts.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::default() }
    }

    /// Backoff before retry number `retry` (0-based), capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.powi(exponent);
        if !factor.is_finite() || factor < 0.0 {
            return self.max_delay;
        }
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up and return the error.
    Stop,
    /// Retry after the policy's backoff delay.
    Backoff,
    /// Retry after at least this long, as requested by the vendor.
    After(Duration),
}

/// Runs `operation`, retrying every error with exponential backoff.
///
/// # Errors
///
/// Returns the last error once `max_attempts` is exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_policy(policy, |_| RetryDecision::Backoff, operation).await
}

/// Runs `operation`, asking `decide` after each failure whether to retry.
///
/// The operation runs at least once, even with `max_attempts == 0`. A
/// [`RetryDecision::After`] longer than `max_delay` ends the loop, since
/// retrying earlier than the vendor asked would only be throttled again.
///
/// # Errors
///
/// Returns the error `decide` stopped on, or the last error once the attempts
/// are exhausted.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// use market_bridge::reliability::{RetryDecision, RetryPolicy, retry_with_policy};
///
/// # async fn example() {
/// let policy = RetryPolicy::with_max_attempts(3);
/// let calls = AtomicU32::new(0);
///
/// let result = retry_with_policy(&policy, |_: &String| RetryDecision::Stop, || async {
///     calls.fetch_add(1, Ordering::Relaxed);
///     Err::<(), _>("listing rejected".to_owned())
/// })
/// .await;
///
/// assert!(result.is_err());
/// assert_eq!(calls.load(Ordering::Relaxed), 1);
/// # }
/// ```
pub async fn retry_with_policy<F, Fut, T, E, D>(
    policy: &RetryPolicy,
    decide: D,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    D: Fn(&E) -> RetryDecision,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "request succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if attempt >= max_attempts {
            return Err(error);
        }

        let backoff = policy.delay_for_attempt(attempt - 1);
        let delay = match decide(&error) {
            RetryDecision::Stop => return Err(error),
            RetryDecision::Backoff => backoff,
            RetryDecision::After(requested) if requested > policy.max_delay => {
                tracing::warn!(
                    retry_after_ms = requested.as_millis(),
                    max_delay_ms = policy.max_delay.as_millis(),
                    "requested retry delay exceeds policy, giving up"
                );
                return Err(error);
            }
            RetryDecision::After(requested) => requested.max(backoff),
        };

        tracing::warn!(attempt, max_attempts, delay_ms = delay.as_millis(), error = %error, "request failed, retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Classifies an adapter error for retry.
///
/// | Error | Decision |
/// |-------|----------|
/// | timeout, connection failure, 5xx | [`Backoff`](RetryDecision::Backoff) |
/// | 429 with `Retry-After` | [`After`](RetryDecision::After) |
/// | 429 without it | [`Backoff`](RetryDecision::Backoff) |
/// | everything else | [`Stop`](RetryDecision::Stop) |
///
/// Authentication failures and vendor exceptions are never retried: the
/// token or the request has to change first.
#[must_use]
pub fn retry_decision(error: &AdapterError) -> RetryDecision {
    match error {
        AdapterError::HttpError(e)
            if e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error()) =>
        {
            RetryDecision::Backoff
        }
        AdapterError::RateLimited { retry_after: Some(delay), .. } => RetryDecision::After(*delay),
        AdapterError::RateLimited { retry_after: None, .. } => RetryDecision::Backoff,
        AdapterError::RemoteApi { status: Some(status), .. } if *status >= 500 => {
            RetryDecision::Backoff
        }
        _ => RetryDecision::Stop,
    }
}

/// Returns `true` if [`retry_decision`] would retry `error`.
///
/// # Examples
///
/// ```
/// use market_bridge::{AdapterError, Vendor, reliability::is_retryable};
///
/// let outage = AdapterError::RemoteApi {
///     vendor: Vendor::Ebay,
///     status: Some(503),
///     message: "Service Unavailable".to_owned(),
/// };
/// assert!(is_retryable(&outage));
/// assert!(!is_retryable(&AdapterError::InvalidInput("blank sku".to_owned())));
/// ```
#[must_use]
pub fn is_retryable(error: &AdapterError) -> bool {
    retry_decision(error) != RetryDecision::Stop
}
