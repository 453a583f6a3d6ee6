//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a read operation after transient (timeout-like) failures
//! - Sleep with linear backoff between attempts
//! - Wrap the last failure with the attempt count once the limit is reached
//!
//! # Design Decisions
//! - Classification uses the failure's tag (`IngestError::is_transient`), not its text
//! - Permanent failures return immediately, unwrapped, without sleeping
//! - Backoff suspends only the retrying task

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::error::{IngestError, IngestResult};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Attempt limit and backoff unit for one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts including the first.
    pub max_attempts: u32,
    /// Retry `n` (1-based) waits `n` units.
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    /// A policy that never retries.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// `operation` receives the zero-based attempt index.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> IngestResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = IngestResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => err,
            };

            attempt += 1;
            if attempt >= max_attempts {
                return Err(IngestError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = calculate_backoff(attempt, self.backoff_unit);
            tracing::warn!(
                attempt,
                max_attempts,
                delay = ?delay,
                error = %err,
                "Retrying read after transient failure"
            );
            metrics::record_retry(err.kind());
            sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.backoff_unit_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn timeout() -> IngestError {
        IngestError::Timeout {
            after: Duration::from_secs(1),
            expected_size: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_not_retried() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let start = Instant::now();

        let result: IngestResult<()> = policy
            .run(|_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(IngestError::Transport(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        match result {
            Err(IngestError::Transport(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected unwrapped transport error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_exhausts_attempts() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let start = Instant::now();

        let result: IngestResult<()> = policy
            .run(|_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(timeout())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Sleeps of 1 and 2 units between the three attempts, none after the last.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(4), "elapsed {:?}", elapsed);

        match result {
            Err(IngestError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, IngestError::Timeout { .. }));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failure() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));

        let result = policy
            .run(|attempt| async move {
                if attempt == 0 {
                    Err(timeout())
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_policy() {
        let calls = &AtomicU32::new(0);
        let result: IngestResult<()> = RetryPolicy::single_attempt()
            .run(|_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(timeout())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(IngestError::RetriesExhausted { attempts: 1, .. })));
    }

    #[test]
    fn test_zero_attempts_treated_as_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
