//! Bounded exponential backoff for failed polls.
//!
//! delay(attempt) = min(base × 2^attempt, cap), attempts counted from 0.
//! No retry is offered once `attempt >= max_retries`.

use std::time::Duration;

/// Backoff schedule for retrying a failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    max_retries: u32,
}

impl BackoffPolicy {
    pub const DEFAULT_BASE: Duration = Duration::from_millis(1_000);
    pub const DEFAULT_CAP: Duration = Duration::from_millis(10_000);

    /// 1s base, 10s cap.
    pub const fn new(max_retries: u32) -> Self {
        Self {
            base: Self::DEFAULT_BASE,
            cap: Self::DEFAULT_CAP,
            max_retries,
        }
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Uncapped-by-count delay for the given attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        // 2^31 ms already dwarfs any sane cap; clamp the shift to avoid overflow.
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.cap, |d| d.min(self.cap))
    }

    /// Delay before the next retry, or `None` once retries are exhausted.
    ///
    /// `attempt` is the consecutive-failure count before the failure
    /// that is being retried.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_retries).then(|| self.delay(attempt))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
