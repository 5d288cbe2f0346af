//! Local call-rate limiting.
//!
//! The upstream service budgets calls per rolling window. [`RateLimiter`]
//! enforces that budget locally with a sliding window of admission
//! timestamps, so a well-behaved client never triggers an upstream 429 in
//! the first place. Should one arrive anyway, [`parse_retry_after`] extracts
//! the server's hint for the retry layer.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

use http::HeaderMap;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Sliding-window rate limiter.
///
/// A call is admitted when fewer than `max_calls` admissions fall inside
/// the trailing `period`. When the window is full,
/// [`acquire`](RateLimiter::acquire) sleeps until the oldest admission ages
/// out and then re-checks, so concurrent callers can never overshoot the
/// budget: the check and the admission record happen atomically under one
/// mutex.
///
/// The mutex is held only to inspect and update the window, never across
/// the sleep or any network call.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_calls` per `period`.
    ///
    /// `Config::validate` rejects a zero budget; the clamp keeps a direct
    /// constructor from wedging `acquire` on an unfillable window.
    pub fn new(max_calls: usize, period: Duration) -> Self {
        RateLimiter {
            max_calls: max_calls.max(1),
            period,
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Waits until a call slot is free, then claims it.
    ///
    /// Never fails; it only delays. The wait is recomputed after every
    /// wake-up because another task may have claimed the freed slot first.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock();
                let now = Instant::now();
                while window
                    .front()
                    .is_some_and(|&admitted| now.duration_since(admitted) >= self.period)
                {
                    window.pop_front();
                }
                if window.len() < self.max_calls {
                    window.push_back(now);
                    return;
                }
                // A full window is non-empty (max_calls >= 1) and its front
                // is younger than `period` after the purge.
                self.period - now.duration_since(window[0])
            };
            tracing::warn!(
                wait_ms = wait.as_millis() as u64,
                "rate limit window full, delaying call"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

/// Parses a `Retry-After` header into a wait duration.
///
/// Supports both the delay-seconds and HTTP-date forms; a date already in
/// the past yields `None`.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = httpdate::parse_http_date(value).ok()?;
    date.duration_since(SystemTime::now()).ok()
}
