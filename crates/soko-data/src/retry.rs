//! Retry policies for fetch operations.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::FetchError;

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Explicit per-attempt schedule, indexed by attempt and capped at the
    /// last entry.
    Schedule(Vec<Duration>),
    /// Exponential backoff with base and max.
    Exponential {
        /// Initial delay.
        base: Duration,
        /// Maximum delay.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(d) => *d,
            Self::Schedule(delays) => {
                if delays.is_empty() {
                    return Duration::ZERO;
                }
                let idx = (attempt as usize).min(delays.len() - 1);
                delays[idx]
            }
            Self::Exponential { base, max } => {
                let multiplier = 2u64.saturating_pow(attempt);
                let delay = Duration::from_millis(base.as_millis() as u64 * multiplier);
                std::cmp::min(delay, *max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Schedule(vec![
            Duration::from_millis(1000),
            Duration::from_millis(2000),
            Duration::from_millis(4000),
        ])
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// Create a new retry policy with the default backoff schedule.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::default(),
        }
    }

    /// Create a policy with no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffStrategy::None,
        }
    }

    /// Set backoff strategy.
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Whether another attempt should be made after `error` on `attempt`.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Run `operation` up to `max_retries + 1` times, sleeping the scheduled
/// backoff between attempts. Only errors classified as retryable trigger
/// another attempt; the last error is returned once attempts are exhausted.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !policy.should_retry(&error, attempt) {
                    return Err(error);
                }
                let delay = policy.backoff.delay_for_attempt(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_backoff(BackoffStrategy::None)
    }

    #[test]
    fn test_schedule_is_capped_at_last_entry() {
        let backoff = BackoffStrategy::default();
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(backoff.delay_for_attempt(9), Duration::from_millis(4000));
    }

    #[test]
    fn test_exponential_backoff_respects_max() {
        let backoff = BackoffStrategy::Exponential {
            base: Duration::from_millis(50),
            max: Duration::from_millis(500),
        };
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(50));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, _> = run_with_retry(&fast_policy(2), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FetchError::Timeout("slow upstream".into()))
                } else {
                    Ok("listings")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("listings"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retry(&fast_policy(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(FetchError::Http {
                    status: 400,
                    url: "/listings".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retry(&fast_policy(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FetchError::Connection("reset".into())) }
        })
        .await;

        assert_eq!(result, Err(FetchError::Connection("reset".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
