use std::time::Duration;

/// Capped exponential reconnect delay: `min(cap, base * factor^(n - 1))` for
/// the n-th consecutive failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub factor: u32,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            factor: 2,
            cap: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Delay before the retry that follows `failures` consecutive failures.
    /// Zero failures means no wait.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let multiplier = self.factor.checked_pow(failures - 1).unwrap_or(u32::MAX);
        self.base
            .checked_mul(multiplier)
            .unwrap_or(Duration::MAX)
            .min(self.cap)
    }
}
