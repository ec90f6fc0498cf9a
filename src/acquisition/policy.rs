//! Per-strategy retry budget and exponential backoff.

use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per strategy, including the first.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub cap_delay: Duration,
    /// Bound on a single attempt; exceeding it counts as a retriable failure.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay,
            cap_delay: config.cap_delay,
            attempt_timeout: config.attempt_timeout,
        }
    }

    /// Sleep after the failed attempt numbered `attempt_index` (0-based):
    /// `min(base_delay * 2^attempt_index, cap_delay)`.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.cap_delay)
            .min(self.cap_delay)
    }

    /// Sum of the sleeps taken if every attempt fails retriably.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries.saturating_sub(1))
            .map(|i| self.delay_for(i))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Worst-case time this policy can spend on one strategy.
    pub fn worst_case(&self) -> Duration {
        self.attempt_timeout
            .saturating_mul(self.max_retries)
            .saturating_add(self.total_backoff())
    }
}
