use std::future::Future;
use std::time::Duration;

use crate::{Result, StreamError};

/// Default attempt ceiling for remote calls
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed delay between attempts
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Wait strategy between failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure
    Fixed(Duration),

    /// `multiplier * 2^(failures - 1)`, clamped to `[min, max]`
    Exponential {
        multiplier: Duration,
        min: Duration,
        max: Duration,
    },
}

impl Backoff {
    /// Delay to wait after the given number of failed attempts (1-based)
    pub fn delay_after(&self, failures: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { multiplier, min, max } => {
                let exponent = failures.saturating_sub(1).min(16);
                let raw = multiplier.saturating_mul(1u32 << exponent);
                raw.clamp(min, max.max(min))
            }
        }
    }
}

/// Bounded retry wrapper for a single logical remote request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_MAX_ATTEMPTS, DEFAULT_DELAY)
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    /// The metadata-fetch shape: 1s multiplier, waits between 4s and 10s
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                multiplier: Duration::from_secs(1),
                min: Duration::from_secs(4),
                max: Duration::from_secs(10),
            },
        }
    }

    /// Run `call` until it succeeds or the attempt ceiling is reached.
    ///
    /// Every failed attempt is logged with its attempt number before waiting.
    /// After the last attempt the final error is wrapped in
    /// [`StreamError::RemoteCallExhausted`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("{} succeeded on attempt {}", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(
                        "{} attempt {}/{} failed: {}",
                        operation,
                        attempt,
                        max_attempts,
                        e
                    );

                    if attempt >= max_attempts {
                        return Err(StreamError::RemoteCallExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            source: e,
                        }
                        .into());
                    }

                    let delay = self.backoff.delay_after(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy() -> RetryPolicy {
        RetryPolicy::fixed(3, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let attempts = AtomicU32::new(0);

        let value = instant_policy()
            .run("flaky call", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        anyhow::bail!("transient failure {}", n);
                    }
                    Ok("done")
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_after_three_attempts() {
        let attempts = AtomicU32::new(0);

        let err = instant_policy()
            .run("broken call", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err::<(), _>(anyhow::anyhow!("failure {}", n)) }
            })
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match err.downcast_ref::<StreamError>() {
            Some(StreamError::RemoteCallExhausted { operation, attempts, source }) => {
                assert_eq!(operation, "broken call");
                assert_eq!(*attempts, 3);
                assert_eq!(source.to_string(), "failure 3");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exhausted_error_chain_names_cause_once() {
        let err = instant_policy()
            .run("summary call", || async {
                Err::<(), _>(anyhow::anyhow!("server error"))
            })
            .await
            .unwrap_err();

        let chain = format!("{:#}", err);
        assert_eq!(chain, "summary call failed after 3 attempts: server error");
        assert_eq!(chain.matches("server error").count(), 1);
    }

    #[tokio::test]
    async fn test_first_success_makes_one_call() {
        let attempts = AtomicU32::new(0);
        let value = instant_policy()
            .run("steady call", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, anyhow::Error>(7) }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(0, Duration::ZERO);
        let result = policy
            .run("single call", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(anyhow::anyhow!("nope")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exponential_backoff_is_clamped() {
        let backoff = RetryPolicy::exponential(3).backoff;
        assert_eq!(backoff.delay_after(1), Duration::from_secs(4));
        assert_eq!(backoff.delay_after(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_after(4), Duration::from_secs(8));
        assert_eq!(backoff.delay_after(10), Duration::from_secs(10));
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::Fixed(Duration::from_secs(5));
        assert_eq!(backoff.delay_after(1), Duration::from_secs(5));
        assert_eq!(backoff.delay_after(2), Duration::from_secs(5));
    }
}
