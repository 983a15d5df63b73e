//! Timing and retry policy for the query cache

use std::time::Duration;

/// Upper bound for a single retry back-off
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Policy shared by every query of a `SyncContext`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Age below which cached data is served without any network call
    pub fresh_for: Duration,

    /// Age below which cached data is still served (with a background
    /// refetch); at or beyond it the entry is evicted
    pub retain_for: Duration,

    /// Additional attempts after the first failure
    pub retries: u32,

    /// Back-off before the first retry, doubled for every further retry
    pub retry_base_delay: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            fresh_for: Duration::from_secs(2 * 60),
            retain_for: Duration::from_secs(10 * 60),
            retries: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// Where a cached entry sits relative to the policy windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    Expired,
}

impl SyncPolicy {
    /// Classify an entry by the time elapsed since it was fetched
    pub fn freshness(&self, age: Duration) -> Freshness {
        if age < self.fresh_for {
            Freshness::Fresh
        } else if age < self.retain_for {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }

    /// Exponential back-off before retry number `attempt` (0-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_base_delay
            .checked_mul(factor)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}
