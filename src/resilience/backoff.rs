//! Delay schedules between retry attempts.

use rand::Rng;
use std::time::Duration;

use crate::config::schema::{PollStrategy, PollerConfig};

/// Delay before retry number `attempt`: `base_ms * 2^(attempt-1)` capped at
/// `max_ms`, plus up to 10% jitter. Attempt 0 never waits.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let Some(exponent) = attempt.checked_sub(1) else {
        return Duration::ZERO;
    };

    let delay_ms = base_ms
        .saturating_mul(2u64.saturating_pow(exponent))
        .min(max_ms);
    let jitter_ms = match delay_ms / 10 {
        0 => 0,
        range => rand::thread_rng().gen_range(0..range),
    };

    Duration::from_millis(delay_ms.saturating_add(jitter_ms))
}

/// Delay policy derived from poller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base_ms: u64, max_ms: u64 },
}

impl Backoff {
    /// Delay to wait before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base_ms, max_ms } => calculate_backoff(attempt, base_ms, max_ms),
        }
    }
}

impl From<&PollerConfig> for Backoff {
    fn from(config: &PollerConfig) -> Self {
        match config.strategy {
            PollStrategy::Fixed => Backoff::Fixed(Duration::from_millis(config.base_delay_ms)),
            PollStrategy::Exponential => Backoff::Exponential {
                base_ms: config.base_delay_ms,
                max_ms: config.max_delay_ms,
            },
        }
    }
}
