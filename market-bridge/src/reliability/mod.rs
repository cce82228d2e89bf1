//! Reliability policies for marketplace calls.
//!
//! Provides retry logic and a circuit breaker. Both are applied per request by
//! [`VendorClient`](crate::vendor::client::VendorClient), so a paginated
//! listing retries the failing page rather than the whole listing.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState,
};
pub use retry::{
    RetryDecision, RetryPolicy, is_retryable, retry_decision, retry_with_backoff, retry_with_policy,
};
