use std::time::Duration;

use super::store::Cache;

/// Sliding-window rate limiter over a namespaced key prefix.
///
/// The window moves continuously with the current time: each check purges
/// entries older than `window`, records the current request, and compares
/// the resulting count against the limit (inclusive, so the Nth request in a
/// window is the last one allowed). The multi-step sequence is not atomic
/// across concurrent requests; transient over-counting within one window is
/// an accepted bounded approximation.
pub struct RateLimiter<C: Cache> {
    cache: C,
    prefix: String,
    limit: u64,
    window: Duration,
}

impl<C: Cache> RateLimiter<C> {
    pub fn new(cache: C, prefix: impl Into<String>, limit: u64, window: Duration) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            limit,
            window,
        }
    }

    /// Returns `true` while the identifier is within its limit for the
    /// current window. On cache outage this returns `false` (fail-closed).
    pub async fn check(&self, identifier: &str) -> bool {
        let key = format!("{}{}", self.prefix, identifier);
        self.cache
            .check_rate_limit(&key, self.limit, self.window.as_millis() as u64)
            .await
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
