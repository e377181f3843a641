//! Retry policy for content uploads.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::error::ArtifactoryError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How often, how long apart, and on which errors to retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub retryable: fn(&ArtifactoryError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            retryable: ArtifactoryError::is_retryable,
        }
    }
}

/// The last failure of a retried operation.
#[derive(Debug)]
pub struct Exhausted {
    pub error: ArtifactoryError,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable
    /// error, runs out of attempts, or `cancel` fires during a delay.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, Exhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ArtifactoryError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            if !(self.retryable)(&error) {
                error!(attempt, error = %error, "non-retryable failure");
                return Err(Exhausted {
                    error,
                    attempts: attempt,
                });
            }
            if attempt >= max_attempts {
                error!(attempt, max_attempts, error = %error, "retries exhausted");
                return Err(Exhausted {
                    error,
                    attempts: attempt,
                });
            }
            warn!(
                attempt,
                max_attempts,
                delay_ms = self.delay.as_millis() as u64,
                error = %error,
                "retryable failure, will retry"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(attempt, "retry cancelled");
                    return Err(Exhausted { error, attempts: attempt });
                }
                _ = tokio::time::sleep(self.delay) => {}
            }
        }
    }
}
