//! Bounded retry with exponential backoff around a [`RepositoryFetcher`].

use async_trait::async_trait;
use std::time::Duration;

use crate::port::repository_fetcher::{FetchError, RepositoryFetcher};

/// Configuration for fetch retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Deadline for each individual attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: RepositoryFetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<F: RepositoryFetcher> RepositoryFetcher for RetryingFetcher<F> {
    async fn fetch(&self, repository: &str, commit: &str, path: &str) -> Result<String, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = tokio::time::timeout(
                self.policy.attempt_timeout,
                self.inner.fetch(repository, commit, path),
            )
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::Timeout {
                    path: path.to_string(),
                })
            });

            match result {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        "Fetch of {} failed (attempt {}/{}): {}; retrying in {:?}",
                        path,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Fails with `error` for the first `failures` calls, then succeeds.
    struct FlakyFetcher {
        failures: u32,
        error: FetchError,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl RepositoryFetcher for FlakyFetcher {
        async fn fetch(&self, _: &str, _: &str, _: &str) -> Result<String, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok("content".to_string())
            }
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            attempt_timeout: Duration::from_secs(1),
        }
    }

    fn transport() -> FetchError {
        FetchError::Transport {
            path: "Posts/a.md".to_string(),
            message: "connection reset".to_string(),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(10), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let fetcher = RetryingFetcher::new(
            FlakyFetcher {
                failures: 2,
                error: transport(),
                calls: calls.clone(),
            },
            fast_policy(3),
        );

        assert_eq!(fetcher.fetch("r", "c", "Posts/a.md").await.unwrap(), "content");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let fetcher = RetryingFetcher::new(
            FlakyFetcher {
                failures: 10,
                error: transport(),
                calls: calls.clone(),
            },
            fast_policy(3),
        );

        let err = fetcher.fetch("r", "c", "Posts/a.md").await.unwrap_err();
        assert_eq!(err, transport());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let not_found = FetchError::NotFound {
            path: "Posts/a.md".to_string(),
            commit: "c".to_string(),
        };
        let fetcher = RetryingFetcher::new(
            FlakyFetcher {
                failures: 10,
                error: not_found.clone(),
                calls: calls.clone(),
            },
            fast_policy(3),
        );

        assert_eq!(fetcher.fetch("r", "c", "Posts/a.md").await.unwrap_err(), not_found);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
