use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::model::ModelError;

/// The upstream call still failed when the retry loop gave up (or the error
/// was not transient to begin with).
#[derive(Debug, Error)]
#[error("generateContent failed after {attempts} attempt(s): {source}")]
pub struct RetryError {
    pub attempts: u32,
    #[source]
    pub source: ModelError,
}

/// Bounded retry with attempt-indexed jittered exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: Self::DEFAULT_MAX_ATTEMPTS }
    }
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// `max_attempts` counts the first call; it is clamped to at least one.
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1) }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// HTTP 500 and 503 are retried; everything else fails immediately.
    pub fn is_transient(err: &ModelError) -> bool {
        matches!(err.status(), Some(500 | 503))
    }

    /// Delay after the zero-based `attempt` failed: `1 + U[0, 2·2^attempt)` seconds.
    pub fn delay(attempt: u32) -> Duration {
        let ceiling = 2u64 << attempt.min(16);
        Duration::from_secs(1 + rand::rng().random_range(0..ceiling))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent. The last attempt's error is never retried.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        let mut attempt = 0;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let is_last = attempt + 1 >= self.max_attempts;
            if is_last || !Self::is_transient(&err) {
                return Err(RetryError { attempts: attempt + 1, source: err });
            }

            let delay = Self::delay(attempt);
            tracing::warn!(
                status = err.status(),
                attempt = attempt + 1,
                delay_secs = delay.as_secs(),
                "model call failed with a transient error, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn api(status: u16) -> ModelError {
        ModelError::Api { status, message: String::new() }
    }

    #[test]
    fn delay_stays_in_jitter_window() {
        for attempt in 0..5 {
            let upper = 1 + (2u64 << attempt);
            for _ in 0..200 {
                let d = RetryPolicy::delay(attempt).as_secs();
                assert!(d >= 1 && d < upper, "attempt {attempt}: {d}s outside [1, {upper})");
            }
        }
    }

    #[test]
    fn only_500_and_503_are_transient() {
        assert!(RetryPolicy::is_transient(&api(500)));
        assert!(RetryPolicy::is_transient(&api(503)));
        assert!(!RetryPolicy::is_transient(&api(429)));
        assert!(!RetryPolicy::is_transient(&api(400)));
        assert!(!RetryPolicy::is_transient(&ModelError::InvalidResponse("x".into())));
    }

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_after_two_sleeps() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = RetryPolicy::default()
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match attempt {
                        0 | 1 => Err(api(503)),
                        _ => Ok("parsed"),
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "parsed");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two sleeps: [1s, 2s] then [1s, 4s].
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2), "waited {waited:?}");
        assert!(waited <= Duration::from_secs(6), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_five_server_errors() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(api(500)) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(err.attempts, 5);
        assert_eq!(err.source.status(), Some(500));
    }

    #[tokio::test(start_paused = true)]
    async fn final_503_is_not_retried_either() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::new(2)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(api(503)) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(err.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let err = RetryPolicy::default()
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(api(400)) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.attempts, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
