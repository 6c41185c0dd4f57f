//! Bounded retry with linearly growing backoff.
//!
//! Every external call in the pipeline (LLM invocations, storage downloads)
//! is wrapped in this policy. Retries run in an explicit loop with an
//! attempt counter; the delay grows linearly with the attempt number.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given failed attempt (1-based).
    /// Strictly increasing: base, 2*base, 3*base, ...
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        self.base_delay * failed_attempt
    }

    /// Runs `operation` until it succeeds or the attempt bound is exhausted,
    /// sleeping the computed backoff between attempts. The last error is
    /// returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }
                    let delay = self.delay_after(attempt);
                    warn!(
                        "Attempt {attempt}/{} failed: {e}. Retrying in {}ms",
                        self.max_attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_backoff_is_strictly_increasing() {
        let policy = test_policy();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_failures() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result: Result<u32, String> = test_policy()
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(format!("transient failure {n}"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Waited 1s after attempt 1 and 2s after attempt 2.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_after_exact_bound() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = test_policy()
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("permanent failure".to_string()) }
            })
            .await;

        assert_eq!(result.unwrap_err(), "permanent failure");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_never_sleeps() {
        let start = tokio::time::Instant::now();
        let result: Result<&str, String> = test_policy().run(|| async { Ok("ok") }).await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
