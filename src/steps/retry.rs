//! Retry policy attached to steps or groups.

use std::time::Duration;

/// Retry budget and pacing for a failing step.
///
/// A budget of `max_retries = N` allows at most `N + 1` attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub delay: Duration,
    /// Factor applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// No retries: the first failure is final.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_delay: Duration::from_secs(60),
        }
    }

    /// Retry immediately up to `max_retries` times.
    pub fn retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::none()
        }
    }

    /// Set the initial delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the exponential backoff multiplier (values below 1.0 are clamped).
    pub fn with_backoff(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Set the cap applied to each delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if self.delay.is_zero() || retry == 0 {
            return Duration::ZERO;
        }
        let factor = self
            .backoff_multiplier
            .powi(retry.saturating_sub(1).min(i32::MAX as u32) as i32);
        if factor == 1.0 {
            return self.delay.min(self.max_delay);
        }
        let secs = self.delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_has_zero_budget() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn constant_delay_without_backoff() {
        let policy = RetryPolicy::retries(3).with_delay(Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = RetryPolicy::retries(10)
            .with_delay(Duration::from_secs(1))
            .with_backoff(2.0)
            .with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(4), Duration::from_secs(5));
        assert_eq!(policy.delay_for(60), Duration::from_secs(5));
    }

    #[test]
    fn backoff_below_one_is_clamped() {
        let policy = RetryPolicy::retries(2)
            .with_delay(Duration::from_millis(40))
            .with_backoff(0.5);
        assert_eq!(policy.backoff_multiplier, 1.0);
        assert_eq!(policy.delay_for(2), Duration::from_millis(40));
    }
}
