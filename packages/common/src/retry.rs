use std::time::Duration;

use rand::Rng;

/// Exponential backoff bounds for one class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl BackoffPolicy {
    /// Transport errors, idle timeouts and dropped connections.
    pub const NETWORK: Self = Self {
        base_ms: 250,
        max_ms: 16_000,
    };
    /// Non-2xx responses other than rate limiting.
    pub const HTTP: Self = Self {
        base_ms: 5_000,
        max_ms: 320_000,
    };
    /// HTTP 420 / 429.
    pub const RATE_LIMITED: Self = Self {
        base_ms: 60_000,
        max_ms: 960_000,
    };
}

/// Consecutive-failure counter that hands out growing delays.
#[derive(Debug, Default)]
pub struct Backoff {
    attempt: u8,
}

impl Backoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and return how long to wait before the next attempt.
    pub fn next_delay(&mut self, policy: BackoffPolicy) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        calculate_backoff(self.attempt, policy.base_ms, policy.max_ms)
    }

    /// Forget previous failures after a healthy connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u8 {
        self.attempt
    }
}

/// Calculate exponential backoff delay with jitter.
///
/// Formula: `min(base_ms * 2^(attempt-1) + jitter, max_ms)` (0-25% jitter)
pub fn calculate_backoff(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp_factor = 2u64.saturating_pow((attempt - 1) as u32);
    let delay_ms = base_ms.saturating_mul(exp_factor);

    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    let total_delay = delay_ms.saturating_add(jitter).min(max_ms);
    Duration::from_millis(total_delay)
}
