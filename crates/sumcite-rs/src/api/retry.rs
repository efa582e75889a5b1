//! Bounded retry with backoff for the completion+parse step.
//!
//! A turn's completion call and the JSON parse of its output are retried as
//! one unit: upstream transport failures and malformed model output both
//! consume an attempt. Validation and unknown-conversation errors are never
//! retried — they are deterministic. When the budget is exhausted the last
//! failure's cause is returned to the caller, never a null or partial result.

use crate::error::{SumciteError, SumciteResult};
use std::time::Duration;
use tracing::warn;

/// Attempt budget and backoff for completion calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts (1 = no retry, just fail on the first error).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier (2.0 for exponential backoff, 1.0 for fixed).
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a config with the given attempt budget. Uses default backoff.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Calculate the delay before the retry following `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(base.min(self.max_delay.as_secs_f64()))
    }
}

/// Run `op` until it succeeds, a non-retryable error occurs, or the attempt
/// budget is exhausted. The last error is propagated on exhaustion.
pub async fn retry_completion<T, F, Fut>(config: &RetryConfig, mut op: F) -> SumciteResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = SumciteResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                attempt += 1;
                if attempt >= config.max_attempts.max(1) || !e.is_retryable() {
                    return Err(e);
                }
                let delay = config.delay_for_attempt(attempt - 1);
                warn!(
                    "completion attempt {attempt}/{} failed: {e}. Retrying in {delay:?}...",
                    config.max_attempts,
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 1.0,
        }
    }

    #[tokio::test]
    async fn first_attempt_success_needs_no_retry() {
        let calls = AtomicU32::new(0);
        let result = retry_completion(&fast_config(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, SumciteError>(42) }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failure_then_success() {
        let calls = AtomicU32::new(0);
        let result = retry_completion(&fast_config(2), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(SumciteError::Upstream("hiccup".into()))
                } else {
                    Ok("ok")
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_budget_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: SumciteResult<()> = retry_completion(&fast_config(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SumciteError::ModelOutput("still not json".into())) }
        })
        .await;
        assert!(matches!(result, Err(SumciteError::ModelOutput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_error_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: SumciteResult<()> = retry_completion(&fast_config(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SumciteError::Validation("bad field".into())) }
        })
        .await;
        assert!(matches!(result, Err(SumciteError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_grows_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
        };
        let d0 = config.delay_for_attempt(0);
        let d1 = config.delay_for_attempt(1);
        assert!(d1 > d0);
        assert!(config.delay_for_attempt(10) <= Duration::from_secs(2));
    }

    #[test]
    fn default_budget_is_two_attempts() {
        assert_eq!(RetryConfig::default().max_attempts, 2);
    }
}
