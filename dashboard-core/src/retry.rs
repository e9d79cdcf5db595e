//! Retry with exponential backoff for weather requests.
//!
//! A failed request is attempted again up to `max_retries` times. The wait
//! before retry `n` (counting from zero) is `initial_delay * 2^n`, capped at
//! `max_delay`. Client-side validation errors are never retried.

use crate::error::ApiError;
use std::{future::Future, time::Duration};

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts made after the first one fails.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Delay before retry number `attempt`, zero-based.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent. Returns the last error in the latter case.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("Request succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => {
                tracing::debug!("Non-retryable error: {}", e);
                return Err(e);
            }
            Err(e) if attempt >= config.max_retries => {
                tracing::error!("All {} attempts failed: {}", attempt + 1, e);
                return Err(e);
            }
            Err(e) => {
                let delay = config.delay_for_attempt(attempt);
                attempt += 1;
                tracing::warn!(
                    "Attempt {} of {} failed: {}; retrying in {:?}",
                    attempt,
                    config.max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };
    use tokio::time::Instant;

    #[test]
    fn default_policy() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn delay_doubles_until_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(16));
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(40), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_operation_runs_three_times_with_growing_waits() {
        let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let start = Instant::now();

        let recorded = calls.clone();
        let result: Result<(), ApiError> = with_retry(&RetryConfig::default(), || {
            let recorded = recorded.clone();
            async move {
                recorded.lock().push(start.elapsed());
                Err(ApiError::Status { status: 500, body: String::new() })
            }
        })
        .await;

        assert_eq!(result.unwrap_err().status(), Some(500));
        let calls = calls.lock();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], Duration::ZERO);
        assert_eq!(calls[1], Duration::from_secs(1));
        assert_eq!(calls[2], Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_one_failure() {
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result = with_retry(&RetryConfig::default(), || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ApiError::Transport("connection reset".into()))
                } else {
                    Ok("sunny")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "sunny");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn validation_errors_fail_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result: Result<(), ApiError> = with_retry(&RetryConfig::default(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Validation("Latitude and longitude are required"))
            }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Validation(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
