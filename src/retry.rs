//! Retry with exponential backoff for transient failures.
//!
//! Transience is decided by [`Error::is_transient`]: timeouts, connection
//! failures, upstream 5xx responses, and upstream rate limiting are worth
//! repeating; everything else fails the call on the spot.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{Error, Result};

/// Exponential-backoff retry policy.
///
/// Each retry waits `initial_delay * 2^n` (capped at `max_delay`), where
/// `n` is zero for the first retry. An upstream `Retry-After` hint replaces
/// the computed wait for that retry. With `jitter` enabled each wait is
/// scaled by a random factor between 50% and 100% to spread synchronized
/// callers; it is off by default so the schedule is exact.
///
/// # Examples
///
/// ```
/// use datagovin::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy {
///     max_retries: 5,
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     jitter: false,
/// };
///
/// // 100ms, 200ms, 400ms, 800ms, 1600ms...
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt, so a call makes at most
    /// `max_retries + 1` attempts.
    pub max_retries: u32,
    /// The delay before the first retry.
    pub initial_delay: Duration,
    /// The maximum delay between attempts.
    pub max_delay: Duration,
    /// Whether to randomize delays to 50-100% of the computed value.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries: every failure is final.
    pub fn disabled() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        }
    }

    /// Returns the backoff before retry number `attempt` (zero-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }

    fn backoff(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let delay = hint.unwrap_or_else(|| self.delay_for_attempt(attempt));
        if self.jitter && !delay.is_zero() {
            let factor = rand::thread_rng().gen_range(0.5..=1.0);
            delay.mul_f64(factor)
        } else {
            delay
        }
    }

    /// Runs `make_call`, retrying transient failures until success, a
    /// permanent failure, or exhaustion.
    ///
    /// Permanent errors propagate unchanged after a single attempt. When
    /// every attempt fails transiently, the last error is wrapped in
    /// [`Error::RetriesExhausted`] together with the attempt count.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut make_call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut failures = 0u32;
        loop {
            match make_call().await {
                Ok(value) => {
                    if failures > 0 {
                        tracing::info!(operation, attempts = failures + 1, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    failures += 1;
                    if failures > self.max_retries {
                        tracing::warn!(
                            operation,
                            attempts = failures,
                            error = %e,
                            "retries exhausted"
                        );
                        return Err(Error::RetriesExhausted {
                            attempts: failures,
                            last_error: Box::new(e),
                        });
                    }
                    let delay = self.backoff(failures - 1, e.retry_after());
                    tracing::warn!(
                        operation,
                        attempt = failures,
                        max_attempts = self.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
