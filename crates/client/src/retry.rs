//! Retry policy for classified API failures.
//!
//! Only [`ErrorKind::is_retryable`](crate::error::ErrorKind::is_retryable)
//! failures (server, connection, timeout) are retried. Attempts are strictly
//! sequential. On exhaustion the last classified failure is surfaced with
//! its attempt count, never a generic "retries exhausted" error.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::error::ApiError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Exponential delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub factor: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(200),
            max: Duration::from_secs(2),
            factor: 1.5,
        }
    }
}

impl Backoff {
    fn next(&self, current: Duration) -> Duration {
        current.mul_f64(self.factor).min(self.max)
    }
}

/// Decides whether a failed attempt is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Option<Backoff>,
}

impl RetryPolicy {
    /// Retry immediately, up to `max_attempts` total attempts (at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: None,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1)
    }

    /// Sleep between attempts, growing exponentially with jitter.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempt` is 1-based: the number of attempts already made.
    pub fn should_retry(&self, error: &ApiError, attempt: u32) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }

    /// Run `op` until it succeeds, fails terminally, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 1;
        let mut delay = self.backoff.map(|b| b.initial);

        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if self.should_retry(&err, attempt) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        kind = err.kind().as_str(),
                        error = %err,
                        "Retrying request"
                    );

                    if let (Some(backoff), Some(current)) = (self.backoff, delay) {
                        tokio::time::sleep(current + jitter()).await;
                        delay = Some(backoff.next(current));
                    }

                    attempt += 1;
                }
                Err(err) => return Err(err.with_attempts(attempt)),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Up to 100ms of jitter, derived from the clock's sub-second nanos.
fn jitter() -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    Duration::from_millis((nanos % 100) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn server_error() -> ApiError {
        ApiError::from_response(500, r#"{"error":"upstream exploded"}"#)
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::default()
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, ApiError>(42) }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_with_last_error() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::new(3)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(server_error()) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.message(), "upstream exploded");
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let result = RetryPolicy::new(3)
            .run(|attempt| async move {
                if attempt < 3 {
                    Err(ApiError::Connection {
                        message: "refused".into(),
                        attempts: 1,
                    })
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_terminal_errors_not_retried() {
        for status in [400u16, 401, 402, 429, 404] {
            let calls = AtomicU32::new(0);
            let err = RetryPolicy::new(5)
                .run(|_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Err::<(), _>(ApiError::from_response(status, "")) }
                })
                .await
                .unwrap_err();
            assert_eq!(calls.load(Ordering::SeqCst), 1, "status {status}");
            assert_eq!(err.status(), Some(status));
        }
    }

    #[tokio::test]
    async fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::new(0);
        assert_eq!(policy.max_attempts(), 1);
        let err = policy
            .run(|_| async { Err::<(), _>(server_error()) })
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let started = tokio::time::Instant::now();
        let policy = RetryPolicy::new(3).with_backoff(Backoff {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(10),
            factor: 2.0,
        });
        let err = policy
            .run(|_| async {
                Err::<(), _>(ApiError::Timeout {
                    message: "slow".into(),
                    attempts: 1,
                })
            })
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), 3);
        // 1s + 2s of base delay, plus jitter.
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_is_capped() {
        let backoff = Backoff {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(3),
            factor: 4.0,
        };
        assert_eq!(backoff.next(Duration::from_secs(1)), Duration::from_secs(3));
    }
}
