//! Bounded exponential backoff for transient store failures.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::LoaderError;

/// `retries` counts re-attempts after the first call, so a batch is tried at
/// most `retries + 1` times per store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// **Default:** `3`
    pub retries: u32,
    /// Delay before the first retry; doubles for every further one.
    ///
    /// **Default:** `100`
    pub backoff_base_ms: u64,
    /// **Default:** `5000`
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_base_ms: 100,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Policy with millisecond delays, for tests and benchmarks.
    pub fn immediate(retries: u32) -> Self {
        Self {
            retries,
            backoff_base_ms: 1,
            max_backoff_ms: 1,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let base = self.backoff_base_ms.max(1);
        let max = self.max_backoff_ms.max(base);
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        Duration::from_millis(base.saturating_mul(factor).min(max))
    }
}

/// Result of a retried operation plus how many calls it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, LoaderError>,
    pub attempts: u32,
}

impl<T> Attempted<T> {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Calls `op` until it succeeds, fails with a non-transient error, or the
/// retry budget is spent.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut op: F) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LoaderError>>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(err) if err.is_transient() && attempts <= policy.retries => {
                let delay = policy.backoff(attempts);
                warn!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient store failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                return Attempted {
                    result: Err(err),
                    attempts,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            retries: 5,
            backoff_base_ms: 100,
            max_backoff_ms: 350,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(30), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn transient_errors_exhaust_the_budget() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let outcome: Attempted<()> = with_retry(&RetryPolicy::immediate(3), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(LoaderError::transient("busy"))
        })
        .await;
        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.retries(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let outcome: Attempted<()> = with_retry(&RetryPolicy::immediate(3), || async {
            Err(LoaderError::store("constraint"))
        })
        .await;
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn success_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let outcome = with_retry(&RetryPolicy::immediate(3), || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(LoaderError::transient("busy"))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(*outcome.result.as_ref().unwrap(), 7);
        assert_eq!(outcome.retries(), 1);
    }
}
