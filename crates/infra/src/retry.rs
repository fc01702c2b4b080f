//! Bounded retry with per-attempt timeouts for upstream calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^(attempt-1)
    #[default]
    Exponential,
    /// Linear backoff: base * attempt
    Linear,
}

/// Retry policy for identity-provider and record-store calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
    /// Jitter factor (0.0-1.0)
    pub jitter: f64,
    /// Per-attempt budget for lookups and account creation.
    pub lookup_timeout: Duration,
    /// Per-attempt budget for claim and record writes.
    pub write_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            strategy: BackoffStrategy::Exponential,
            jitter: 0.1,
            lookup_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
            jitter: 0.0,
            ..Default::default()
        }
    }

    pub fn with_timeouts(mut self, lookup: Duration, write: Duration) -> Self {
        self.lookup_timeout = lookup;
        self.write_timeout = write;
        self
    }

    /// Delay before the attempt following `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;

        let delay_ms = match self.strategy {
            BackoffStrategy::Fixed => base_ms,
            BackoffStrategy::Exponential => {
                let exp = 2_f64.powi((attempt - 1) as i32);
                (base_ms * exp).min(max_ms)
            }
            BackoffStrategy::Linear => (base_ms * attempt as f64).min(max_ms),
        };

        let jitter_range = delay_ms * self.jitter;
        let jitter = if jitter_range > 0.0 {
            let spread: f64 = rand::random::<f64>() - 0.5;
            jitter_range * spread * 2.0
        } else {
            0.0
        };

        Duration::from_millis((delay_ms + jitter).max(0.0) as u64)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Whether a failed attempt is worth repeating.
///
/// Validation, authorization and not-found outcomes are deterministic and
/// never retried.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy is exhausted. Each attempt runs under `timeout`.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    timeout: Duration,
    mut attempt: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Into<ServiceError> + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut n = 1;

    loop {
        let failure = match tokio::time::timeout(timeout, attempt()).await {
            Ok(Ok(value)) => {
                if n > 1 {
                    tracing::info!(operation, attempt = n, "upstream call recovered");
                }
                return Ok(value);
            }
            Ok(Err(e)) if !e.is_retryable() => return Err(e.into()),
            Ok(Err(e)) => {
                tracing::warn!(operation, attempt = n, error = %e, "upstream call failed");
                e.into()
            }
            Err(_) => {
                tracing::warn!(operation, attempt = n, timeout_ms = timeout.as_millis() as u64, "upstream call timed out");
                ServiceError::UpstreamTimeout(operation)
            }
        };

        if n >= max_attempts {
            tracing::error!(operation, attempts = n, "giving up on upstream call");
            return Err(failure);
        }

        tokio::time::sleep(policy.delay_for_attempt(n)).await;
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use hosteldesk_core::DomainError;
    use proptest::prelude::*;

    #[derive(Debug, thiserror::Error)]
    enum FakeError {
        #[error("flaky")]
        Flaky,
        #[error("bad input")]
        BadInput,
    }

    impl Retryable for FakeError {
        fn is_retryable(&self) -> bool {
            matches!(self, FakeError::Flaky)
        }
    }

    impl From<FakeError> for ServiceError {
        fn from(e: FakeError) -> Self {
            match e {
                FakeError::Flaky => ServiceError::UpstreamFailure {
                    operation: "fake",
                    message: e.to_string(),
                },
                FakeError::BadInput => DomainError::validation("bad input").into(),
            }
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy::fixed(3, Duration::from_millis(1))
    }

    #[test]
    fn exponential_delays_grow_and_cap() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn linear_delays_step_by_the_base() {
        let policy = RetryPolicy {
            strategy: BackoffStrategy::Linear,
            jitter: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(), "fake", Duration::from_secs(1), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(FakeError::Flaky)
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast(), "fake", Duration::from_secs(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FakeError::BadInput)
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Domain(DomainError::Validation(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_timeouts_surface_as_upstream_timeout() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> =
            with_retry(&fast(), "slow lookup", Duration::from_millis(5), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), FakeError>(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::UpstreamTimeout("slow lookup"))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    proptest! {
        #[test]
        fn jittered_delay_stays_near_the_cap(attempt in 1u32..64) {
            let policy = RetryPolicy::default();
            let ceiling = policy.max_delay.as_millis() as f64 * (1.0 + policy.jitter);
            prop_assert!(policy.delay_for_attempt(attempt).as_millis() as f64 <= ceiling);
        }
    }
}
