//! Retry policy for external calls
//!
//! Every outbound HTTP call in the pipeline runs through one of these
//! policies rather than an inline sleep loop, so the backoff schedule is
//! visible in one place and testable without a network.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::{Error, Result};

/// Exponential-backoff retry policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, the first included
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// Three attempts with 1s/2s backoff between them
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after a failed attempt (1-based): `base * 2^(attempt-1)`
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2_u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Run `op`, retrying on retryable errors up to `max_attempts` times.
    ///
    /// Non-retryable errors (validation, expired resources) short-circuit
    /// on the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        call = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "external call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(call = label, attempt, error = %e, "external call failed");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_schedule_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn retries_transient_errors_up_to_cap() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast_policy()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::Transient("flaky".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = fast_policy()
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(Error::Transient("flaky".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_resources_short_circuit() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast_policy()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::ResourceExpired("gone".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
