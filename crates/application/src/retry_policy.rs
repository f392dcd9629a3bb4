use std::time::Duration;

/// Total attempts used when none are configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Backoff base used when none is configured.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);
/// Longest pause between two attempts.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` total attempts (at least 1).
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: DEFAULT_MAX_BACKOFF,
        }
    }

    /// Caps the pause between attempts.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Returns the total number of attempts.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns whether another attempt may follow `attempt` (1-based).
    #[must_use]
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Pause after the failed attempt number `attempt` (1-based):
    /// `base * 2^(attempt - 1)`, capped at the max delay.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1_u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF_BASE)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::RetryPolicy;

    #[test]
    fn delays_double_from_the_base() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn delays_are_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(250));

        assert_eq!(policy.delay_after(3), Duration::from_millis(250));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_millis(250));
    }

    #[test]
    fn attempt_budget_counts_the_first_try() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
