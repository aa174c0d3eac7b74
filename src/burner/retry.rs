//! Rate-limit aware retry executor.
//!
//! One policy shared by the aggregator HTTP calls and the RPC calls. Only
//! [`BurnError::RateLimited`] is retried; the delay before retry `n`
//! (starting at 0) is `base_delay * 2^n`.

use crate::burner::error::BurnError;
use std::future::Future;
use std::time::Duration;
use tokio_retry::RetryIf;
use tracing::{debug, warn};

/// Bounded exponential back-off for throttled network calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    /// Delay before the first retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delays between attempts: `base, 2*base, 4*base, ...`, one fewer than
    /// the number of attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let base = self.base_delay;
        (0u32..)
            .map(move |attempt| {
                let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            })
            .take(self.max_attempts.saturating_sub(1))
    }

    /// Run `operation`, retrying it while it reports a rate limit.
    ///
    /// Non rate-limit errors are returned untouched after the first failure.
    /// Running out of attempts yields [`BurnError::MaxRetriesExceeded`].
    pub async fn execute<T, F, Fut>(&self, operation: &str, action: F) -> Result<T, BurnError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BurnError>>,
    {
        let result = RetryIf::spawn(
            self.delays(),
            action,
            |err: &BurnError| {
                let retry = err.is_rate_limited();
                if retry {
                    warn!("{} rate limited, backing off: {}", operation, err);
                }
                retry
            },
        )
        .await;

        match result {
            Ok(value) => Ok(value),
            Err(err) if err.is_rate_limited() => Err(BurnError::MaxRetriesExceeded {
                operation: operation.to_string(),
                attempts: self.max_attempts,
                last: err.to_string(),
            }),
            Err(err) => {
                debug!("{} failed without retry: {}", operation, err);
                Err(err)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(500))
    }
}
