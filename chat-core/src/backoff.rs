//! Retry policy for relaychat requests.
//!
//! Requests are retried forever. The delay before each retry starts at a
//! base value and is multiplied by a growth factor after every failure.
//! There is no jitter; a cap is optional and absent by default.
//!
//! A [`Backoff`] holds the per-call state. Every call to the resilient fetch
//! starts from a fresh [`RetryPolicy::backoff`], so the delay resets to the
//! base value at the start of each call.

use std::time::Duration;

/// Delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Multiplier applied to the delay after each failure.
pub const DEFAULT_GROWTH_FACTOR: u32 = 2;

/// How long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier per failure (values below 1 are treated as 1).
    pub growth_factor: u32,
    /// Optional upper bound on a single delay.
    pub max_delay: Option<Duration>,
}

impl RetryPolicy {
    /// Unbounded exponential policy starting at `base_delay`.
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_delay: None,
        }
    }

    /// Set the growth factor.
    pub fn with_growth_factor(mut self, factor: u32) -> Self {
        self.growth_factor = factor;
        self
    }

    /// Cap every delay at `max`.
    pub fn with_max_delay(mut self, max: Duration) -> Self {
        self.max_delay = Some(max);
        self
    }

    /// Fresh backoff state for one call.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: *self,
            attempt: 0,
            next: self.clamp(self.base_delay),
        }
    }

    /// Delay after the given failed attempt (1-based).
    ///
    /// Formula: min(cap, base * factor^(attempt - 1)), saturating.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let mut delay = self.clamp(self.base_delay);
        for _ in 1..attempt {
            let grown = self.grow(delay);
            if grown == delay {
                break;
            }
            delay = grown;
        }
        delay
    }

    fn grow(&self, delay: Duration) -> Duration {
        let factor = self.growth_factor.max(1);
        self.clamp(delay.checked_mul(factor).unwrap_or(Duration::MAX))
    }

    fn clamp(&self, delay: Duration) -> Duration {
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY)
    }
}

/// Per-call backoff state.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    attempt: u32,
    next: Duration,
}

impl Backoff {
    /// Record a failed attempt and return how long to wait before the next.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.attempt = self.attempt.saturating_add(1);
        self.next = self.policy.grow(delay);
        delay
    }

    /// Number of failed attempts recorded so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The delay the next failure will produce.
    pub fn peek(&self) -> Duration {
        self.next
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
