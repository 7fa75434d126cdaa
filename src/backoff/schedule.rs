//! Exponential backoff schedule.

use std::time::Duration;

use crate::config::BackoffConfig;

/// Polling schedule for a convergence wait.
///
/// Delays start at `initial_delay`, grow by `multiplier` after each poll that
/// returns a transitional status, and never exceed `max_delay`. The whole
/// wait is bounded by `deadline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    pub initial_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
    pub deadline: Duration,
}

impl BackoffSchedule {
    /// Create a schedule.
    pub fn new(
        initial_delay: Duration,
        multiplier: u32,
        max_delay: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            initial_delay,
            multiplier: multiplier.max(1),
            max_delay,
            deadline,
        }
    }

    /// Build a schedule from configuration and the wait deadline.
    pub fn from_config(config: &BackoffConfig, deadline: Duration) -> Self {
        Self::new(
            Duration::from_millis(config.initial_delay_ms),
            config.multiplier,
            Duration::from_millis(config.max_delay_ms),
            deadline,
        )
    }

    /// Delay that follows `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(self.multiplier).min(self.max_delay)
    }

    /// Delay before poll number `attempt` (zero based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 0..attempt {
            if delay == self.max_delay {
                break;
            }
            delay = self.next_delay(delay);
        }
        delay
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(100),
            2,
            Duration::from_secs(5),
            Duration::from_secs(30),
        )
    }
}
