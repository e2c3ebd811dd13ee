// crates/sync-engine/src/backoff.rs
//! Exponential per-item backoff

use std::time::Duration;

/// Exponential backoff schedule for transient failures
///
/// Delay for the n-th retry is `base * 2^(n-1)`, capped at `max`. Applied
/// per queue item, not globally, so unrelated items keep draining while one
/// backs off.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl BackoffPolicy {
    /// Creates a policy from a base unit and a cap
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before an item with `retry_count` failures is eligible again
    pub fn delay_for_retry(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }
        let exponent = retry_count.saturating_sub(1).min(31);
        let factor = 1u64 << exponent;
        self.base
            .checked_mul(factor as u32)
            .map_or(self.max, |d| d.min(self.max))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}
