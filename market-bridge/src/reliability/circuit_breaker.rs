//! Circuit breaker guarding a single marketplace.
//!
//! When a vendor keeps failing, the breaker stops sending it requests for a
//! while so a scheduled sync does not hammer an API that is already down.
//! Each adapter owns its own breaker, so one vendor's outage never blocks
//! another.
//!
//! # State Transitions
//!
//! ```text
//! Closed ──[failure_threshold failures]──> Open
//!   ▲                                        │
//!   │                                        │ [reset_timeout expires]
//!   │                                        ▼
//!   └──[success_threshold successes]── HalfOpen
//!          [any failure] ──────────────────> Open
//! ```
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//!
//! use market_bridge::{
//!     Vendor,
//!     reliability::{CircuitBreaker, CircuitBreakerConfig, CircuitState},
//! };
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new(Vendor::Amazon, CircuitBreakerConfig {
//!     failure_threshold: 5,
//!     success_threshold: 2,
//!     reset_timeout: Duration::from_secs(60),
//! });
//!
//! let result = breaker.call(|| async { Ok::<_, String>("orders") }).await;
//!
//! assert!(result.is_ok());
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! # }
//! ```

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use thiserror::Error;
use tokio::time::Instant;

use crate::vendor::Vendor;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow through.
    Closed,
    /// Requests are rejected without calling the vendor.
    Open,
    /// Probing recovery: requests flow, one failure reopens the circuit.
    HalfOpen,
}

/// Breaker thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in the Closed state that open the circuit (default: 5).
    pub failure_threshold: u64,

    /// Consecutive successes in the `HalfOpen` state that close the circuit (default: 2).
    pub success_threshold: u64,

    /// Time spent Open before the next call is let through as a probe (default: 60s).
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, success_threshold: 2, reset_timeout: Duration::from_secs(60) }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed { failures: u64 },
    /// `None` when the reset timeout is too large to fit on the clock.
    Open { until: Option<Instant> },
    HalfOpen { successes: u64 },
}

/// Circuit breaker for one vendor.
///
/// Thread-safe; the lock is never held across an `.await`.
#[derive(Debug)]
pub struct CircuitBreaker {
    vendor: Vendor,
    config: CircuitBreakerConfig,
    phase: Mutex<Phase>,
}

impl CircuitBreaker {
    /// Creates a closed breaker for `vendor`.
    #[must_use]
    pub fn new(vendor: Vendor, config: CircuitBreakerConfig) -> Self {
        Self { vendor, config, phase: Mutex::new(Phase::Closed { failures: 0 }) }
    }

    /// Returns the breaker configuration.
    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns the current state.
    ///
    /// An open circuit whose reset timeout has expired still reports
    /// [`CircuitState::Open`] until the next call probes the vendor.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        match *self.phase() {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Runs `operation` unless the circuit is open.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitBreakerError::Open`] without running `operation` while
    /// the circuit is open, or [`CircuitBreakerError::Inner`] if it fails.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.admit()?;

        let result = operation().await;
        match result {
            Ok(_) => self.on_success(),
            Err(_) => self.on_failure(),
        }
        result.map_err(CircuitBreakerError::Inner)
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit<E>(&self) -> Result<(), CircuitBreakerError<E>> {
        let mut phase = self.phase();
        if let Phase::Open { until } = *phase {
            if until.is_none_or(|until| Instant::now() < until) {
                return Err(CircuitBreakerError::Open);
            }
            *phase = Phase::HalfOpen { successes: 0 };
            tracing::info!(vendor = %self.vendor, "circuit half-open, probing vendor");
        }
        Ok(())
    }

    fn on_success(&self) {
        let mut phase = self.phase();
        match *phase {
            Phase::Closed { .. } => *phase = Phase::Closed { failures: 0 },
            Phase::HalfOpen { successes } if successes + 1 >= self.config.success_threshold => {
                *phase = Phase::Closed { failures: 0 };
                tracing::info!(vendor = %self.vendor, "circuit closed, vendor recovered");
            }
            Phase::HalfOpen { successes } => *phase = Phase::HalfOpen { successes: successes + 1 },
            // A call admitted before the circuit opened.
            Phase::Open { .. } => {}
        }
    }

    fn on_failure(&self) {
        let mut phase = self.phase();
        let failures = match *phase {
            Phase::Closed { failures } if failures + 1 < self.config.failure_threshold => {
                *phase = Phase::Closed { failures: failures + 1 };
                return;
            }
            Phase::Closed { failures } => failures + 1,
            Phase::HalfOpen { .. } => 1,
            Phase::Open { .. } => return,
        };

        *phase = Phase::Open { until: Instant::now().checked_add(self.config.reset_timeout) };
        tracing::warn!(
            vendor = %self.vendor,
            failures,
            reset_timeout_ms = self.config.reset_timeout.as_millis(),
            "circuit opened"
        );
    }
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the operation was not attempted.
    #[error("Circuit breaker is open")]
    Open,

    /// The operation ran and failed.
    #[error(transparent)]
    Inner(E),
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::advance;

    use super::*;

    fn breaker(failure_threshold: u64, success_threshold: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            Vendor::Ebay,
            CircuitBreakerConfig { failure_threshold, success_threshold, reset_timeout: Duration::from_secs(30) },
        )
    }

    async fn fail(breaker: &CircuitBreaker) {
        let _ = breaker.call(|| async { Err::<(), _>("503 Service Unavailable") }).await;
    }

    async fn succeed(breaker: &CircuitBreaker) {
        let _ = breaker.call(|| async { Ok::<_, &str>(()) }).await;
    }

    #[test]
    fn test_default_config() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.success_threshold, 2);
        assert_eq!(config.reset_timeout, Duration::from_secs(60));
        assert_eq!(CircuitBreaker::new(Vendor::Shopify, config).state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_inner_error_is_returned() {
        let breaker = breaker(5, 1);

        let result = breaker.call(|| async { Err::<(), _>("listing rejected") }).await;

        assert!(matches!(result, Err(CircuitBreakerError::Inner("listing rejected"))));
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_operation() {
        let breaker = breaker(3, 1);
        for _ in 0..3 {
            fail(&breaker).await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let calls = AtomicU32::new(0);
        let result = breaker
            .call(|| async {
                calls.fetch_add(1, Ordering::Relaxed);
                Ok::<_, &str>(())
            })
            .await;

        assert!(matches!(result, Err(CircuitBreakerError::Open)));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_failures() {
        let breaker = breaker(2, 1);

        fail(&breaker).await;
        succeed(&breaker).await;
        fail(&breaker).await;

        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_through_half_open() {
        let breaker = breaker(2, 2);
        fail(&breaker).await;
        fail(&breaker).await;

        advance(Duration::from_secs(29)).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        advance(Duration::from_secs(1)).await;
        succeed(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        succeed(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_for_full_timeout() {
        let breaker = breaker(1, 3);
        fail(&breaker).await;
        advance(Duration::from_secs(30)).await;

        succeed(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        advance(Duration::from_secs(29)).await;
        let result = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn test_unbounded_reset_timeout_stays_open() {
        let breaker = CircuitBreaker::new(
            Vendor::Ebay,
            CircuitBreakerConfig { failure_threshold: 1, success_threshold: 1, reset_timeout: Duration::MAX },
        );

        fail(&breaker).await;

        assert_eq!(breaker.state(), CircuitState::Open);
        let result = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open)));
    }

    #[test]
    fn test_error_display() {
        let open: CircuitBreakerError<String> = CircuitBreakerError::Open;
        assert_eq!(open.to_string(), "Circuit breaker is open");

        let inner: CircuitBreakerError<String> = CircuitBreakerError::Inner("timed out".to_owned());
        assert_eq!(inner.to_string(), "timed out");
    }
}
