use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;

/// The default number of scrape attempts before giving up on a transient failure.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// The default delay before the first resumed attempt.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1_000;

/// The default upper bound for a single delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Exponential backoff used when a scrape is resumed after a transient failure.
///
/// Delays double from `initial_backoff_ms` and are capped at `max_delay`. The number of
/// delays is one less than `max_attempts`, since the first attempt is not delayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeBackoff {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    /// Delay before the second attempt
    pub initial_backoff_ms: u64,
    /// Cap for any single delay
    pub max_delay: Duration,
}

impl Default for ScrapeBackoff {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_delay: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl ScrapeBackoff {
    /// Iterator over the delays between attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        // `ExponentialBackoff` yields `factor * base^n`, so base 2 doubles from `2 * factor`.
        let factor = (self.initial_backoff_ms / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_delay)
            .take(self.max_attempts.saturating_sub(1))
    }
}
