//! Bounded retry with optional capped exponential backoff
//!
//! Wraps one asynchronous operation and re-invokes it on failure, sleeping
//! between attempts on the tokio timer so a waiting retry never occupies a
//! worker thread.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::{BackoffConfig, CrawlConfig};

/// Delay schedule applied between failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the second attempt
    pub initial: Duration,
    /// Factor applied after each failed attempt
    pub multiplier: u32,
    /// Upper bound on the delay
    pub max: Duration,
}

impl Backoff {
    /// Delay preceding the given retry (0-based index of the failure)
    ///
    /// The sequence for (1s, ×2, cap 8s) is 1, 2, 4, 8, 8, 8, …
    fn delay_after_failure(&self, failure_index: u32) -> Duration {
        let mut delay = self.initial;
        for _ in 0..failure_index {
            delay = delay.saturating_mul(self.multiplier).min(self.max);
        }
        delay.min(self.max)
    }
}

/// Retry policy for one asynchronous unit of work
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Option<Backoff>,
}

impl RetryPolicy {
    /// Bounded attempts with no delay between them
    pub fn fixed(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: None,
        }
    }

    /// Bounded attempts with a capped exponential delay between them
    pub fn with_backoff(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Some(backoff),
        }
    }

    /// Builds the policy a crawl configuration asks for
    pub fn from_config(config: &CrawlConfig) -> Self {
        match &config.backoff {
            Some(backoff) => Self::with_backoff(config.retry_attempts, Backoff::from(backoff)),
            None => Self::fixed(config.retry_attempts),
        }
    }

    /// Maximum number of invocations of the wrapped operation
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs the operation, retrying failures until success or exhaustion
    ///
    /// On exhaustion the last error is returned; the policy never panics
    /// or escalates beyond its caller.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut failures = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    failures += 1;
                    if failures >= self.max_attempts {
                        tracing::warn!(
                            "{}: giving up after {} attempt(s): {}",
                            label,
                            failures,
                            error
                        );
                        return Err(error);
                    }

                    let delay = self
                        .backoff
                        .map(|b| b.delay_after_failure(failures - 1))
                        .unwrap_or(Duration::ZERO);
                    tracing::debug!(
                        "{}: attempt {} failed ({}), retrying in {:?}",
                        label,
                        failures,
                        error,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

impl From<&BackoffConfig> for Backoff {
    fn from(config: &BackoffConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_ms),
            multiplier: config.multiplier,
            max: Duration::from_millis(config.max_ms),
        }
    }
}
