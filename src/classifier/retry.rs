//! Bounded retry with exponential backoff for classifier calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::client::ClassifierError;
use crate::config::RetryConfig;

/// Governs retry of a single-attempt classifier operation.
///
/// Only transient failures are retried. Capacity signals fail fast and shape
/// mismatches are not retried because another attempt cannot fix them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Wait before the retry following the given failed attempt (1-based).
    ///
    /// Exponential in the attempt number, clamped to the configured bounds,
    /// so the schedule is monotonic non-decreasing with an upper bound.
    fn wait_after_attempt(&self, attempt: u32) -> Duration {
        let exp =
            self.config.base.as_secs_f64() * 2f64.powi(attempt.saturating_sub(1).min(30) as i32);
        let clamped = exp.clamp(
            self.config.min_wait.as_secs_f64(),
            self.config.max_wait.as_secs_f64(),
        );
        Duration::from_secs_f64(clamped)
    }

    /// Run `op` until it succeeds, fails non-retryably, or the attempt
    /// budget is spent.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, ClassifierError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClassifierError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let wait = self.wait_after_attempt(attempt);
                    warn!(
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        category = err.category(),
                        error = %err,
                        "classifier attempt failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    warn!(attempt, category = err.category(), "classifier retry budget exhausted");
                    return Err(ClassifierError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(
                        attempt,
                        category = err.category(),
                        error = %err,
                        "classifier attempt failed, not retryable"
                    );
                    return Err(err);
                }
            }
        }
    }
}
