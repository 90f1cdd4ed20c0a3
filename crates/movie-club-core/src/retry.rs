use movie_club_config::RetryConfig;
use movie_club_sources::SourceError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fixed-count, fixed-backoff retry for reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            attempts: config.read_attempts.max(1),
            backoff: config.backoff(),
        }
    }

    pub fn none() -> Self {
        Self { attempts: 1, backoff: Duration::ZERO }
    }
}

/// Run a read, retrying transient upstream failures.
/// Anything that is not transient (not found, decode errors) returns immediately.
pub async fn retry_read<T, F, Fut>(policy: &RetryPolicy, what: &str, mut read: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match read().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> SourceError {
        SourceError::Http { service: "sanity", status: 503, body: String::new() }
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy { attempts: 3, backoff: Duration::ZERO };
        let result = retry_read(&policy, "fetch", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unavailable())
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy { attempts: 2, backoff: Duration::ZERO };
        let result: Result<(), _> = retry_read(&policy, "fetch", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_not_found() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = retry_read(&RetryPolicy::default(), "fetch", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(SourceError::DocumentNotFound("m1".to_string()))
        })
        .await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
