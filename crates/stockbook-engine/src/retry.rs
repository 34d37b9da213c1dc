//! # Compare-and-Swap Retry
//!
//! Re-runs a whole unit of work when its version-checked write loses a race.
//!
//! ## Attempt Loop
//! ```text
//! attempt 1: begin tx → read → decide → CAS write ✗ (stale) → drop tx
//!            sleep backoff × 1
//! attempt 2: begin tx → read → decide → CAS write ✓ → commit
//!
//! rule violation on any attempt      → returned at once, no retry
//! stale/busy on attempt max_attempts → CoreError::Conflict
//! ```
//!
//! Every attempt starts from a fresh read, so the business checks run again
//! against the state that beat us.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::EngineResult;
use stockbook_core::CoreError;

/// Bounds on how often a conflicting unit of work is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 act as 1.
    pub max_attempts: u32,

    /// Linear backoff unit; attempt `n` waits `backoff × n` before the next.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            backoff: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            backoff,
        }
    }

    /// Delay after failed attempt `attempt` (1-based).
    #[inline]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// Runs `unit` until it succeeds, fails with a non-retryable error, or
/// exhausts `policy`.
///
/// `entity` and `id` name what was contended in the resulting `Conflict`.
pub(crate) async fn with_cas_retry<T, F, Fut>(
    policy: &RetryPolicy,
    entity: &'static str,
    id: &str,
    mut unit: F,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match unit().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                if attempt >= max_attempts {
                    warn!(entity, id = %id, attempts = attempt, error = %err, "Retries exhausted");
                    return Err(CoreError::Conflict {
                        entity,
                        id: id.to_string(),
                        attempts: attempt,
                    }
                    .into());
                }

                debug!(entity, id = %id, attempt, error = %err, "Write conflict, retrying");
                tokio::time::sleep(policy.delay_for(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use stockbook_core::ErrorKind;
    use stockbook_db::DbError;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_conflicts() {
        let calls = AtomicU32::new(0);

        let result = with_cas_retry(&fast(5), "Product", "p-1", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(EngineError::from(DbError::stale("Product", "p-1")))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_conflict() {
        let calls = AtomicU32::new(0);

        let err = with_cas_retry(&fast(3), "Product", "p-1", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(EngineError::from(DbError::Busy("database is locked".into()))) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(
            err,
            EngineError::Domain(CoreError::Conflict { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_domain_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let err = with_cas_retry(&fast(5), "Product", "p-1", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(EngineError::from(CoreError::not_found("Product", "p-1"))) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(3), Duration::from_millis(30));
    }
}
