//! Exponential backoff for stall reconnection.
//!
//! Pure timing arithmetic with no I/O; the controller owns one policy and
//! drives it from its reconnect loop.

use core_runtime::config::BackoffConfig;
use std::time::Duration;

/// Capped exponential backoff with an attempt budget.
///
/// `next_delay() == min(initial_wait_time * 2^attempt, maximum_wait_time)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    config: BackoffConfig,
    attempt: u32,
}

impl BackoffPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Reconnect attempts scheduled since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Delay for an arbitrary attempt number.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.config
            .initial_wait_time
            .saturating_mul(factor)
            .min(self.config.maximum_wait_time)
    }

    /// Delay before the next reconnect attempt.
    pub fn next_delay(&self) -> Duration {
        self.delay_for(self.attempt)
    }

    /// Counts one scheduled attempt, whether or not it ends up succeeding.
    pub fn record_attempt(&mut self) {
        self.attempt = self.attempt.saturating_add(1);
    }

    /// True once the attempt budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.config.maximum_attempts
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
