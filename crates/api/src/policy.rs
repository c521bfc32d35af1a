//! Retry policy shared by the executor's inner and outer retry layers.

use std::fmt::Debug;
use std::time::Duration;

/// Outer retry layer: re-run an operation a bounded number of times with a
/// constant delay between attempts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Backoff {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay slept between two attempts.
    pub delay: Duration,
}
impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}
impl Backoff {
    /// Run `op` until it succeeds, fails with an error `should_retry` rejects,
    /// or the attempts run out. The last error is returned unchanged.
    ///
    /// `op` receives the (1-based) attempt number.
    pub async fn retry<T, E, F, Fut>(&self, mut op: F, should_retry: impl Fn(&E) -> bool) -> Result<T, E>
    where
        E: Debug,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && should_retry(&err) => {
                    tracing::warn!(attempt, max_attempts = self.max_attempts, delay = ?self.delay, error = ?err, "Backing off before next attempt");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                },
                Err(err) => return Err(err),
            }
        }
    }
}

/// Limits and delays governing a single logical API call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Slept before every physical request, retries included. Keeps the
    /// client well below the per-account rate limit.
    pub courtesy_delay: Duration,
    /// Slept after a 429, and before retrying any other unexpected error status.
    pub cooldown: Duration,
    /// How many times the `alternative_titles` field may be stripped from the
    /// query in response to a 400.
    pub max_alt_title_retries: u32,
    /// How many times an unexpected error status (anything >= 400 that isn't
    /// 401, 404 or 429) is retried after a cooldown.
    pub max_generic_retries: u32,
    /// Outer retry layer for requests that didn't complete.
    pub backoff: Backoff,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            courtesy_delay: Duration::from_secs(1),
            cooldown: Duration::from_secs(60),
            max_alt_title_retries: 3,
            max_generic_retries: 5,
            backoff: Backoff::default(),
        }
    }
}
impl RetryPolicy {
    /// Same limits as the default policy, but without any sleeping.
    ///
    /// Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub fn without_delays() -> Self {
        Self {
            courtesy_delay: Duration::ZERO,
            cooldown: Duration::ZERO,
            backoff: Backoff {
                delay: Duration::ZERO,
                ..Backoff::default()
            },
            ..Self::default()
        }
    }
}
