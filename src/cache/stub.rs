use async_trait::async_trait;

use super::store::Cache;

/// No-op backend substituted in test mode.
///
/// Every operation succeeds trivially with its neutral value, so code paths
/// built on the cache run end to end without any network access. The
/// responses deliberately match the facade's fallback table, which is also
/// what makes this a faithful stand-in for "cache reachable but empty".
#[derive(Debug, Default, Clone, Copy)]
pub struct StubCache;

#[async_trait]
impl Cache for StubCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_seconds: Option<u64>) -> bool {
        true
    }

    async fn del(&self, _key: &str) -> bool {
        true
    }

    async fn exists(&self, _key: &str) -> bool {
        false
    }

    async fn expire(&self, _key: &str, _seconds: u64) -> bool {
        true
    }

    async fn s_add(&self, _key: &str, _member: &str) -> u64 {
        1
    }

    async fn s_members(&self, _key: &str) -> Vec<String> {
        Vec::new()
    }

    async fn s_rem(&self, _key: &str, _member: &str) -> u64 {
        1
    }

    async fn s_card(&self, _key: &str) -> u64 {
        0
    }

    async fn z_add(&self, _key: &str, _score: f64, _member: &str) -> u64 {
        1
    }

    async fn z_card(&self, _key: &str) -> u64 {
        0
    }

    async fn z_rem_range_by_score(&self, _key: &str, _min: f64, _max: f64) -> u64 {
        0
    }

    async fn incr(&self, _key: &str) -> i64 {
        1
    }

    async fn ping(&self) -> bool {
        true
    }

    async fn check_rate_limit(&self, _key: &str, _limit: u64, _window_ms: u64) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_responses() {
        let cache = StubCache;
        assert_eq!(cache.get("anything").await, None);
        assert!(cache.set("k", "v", Some(60)).await);
        assert!(!cache.exists("k").await);
        assert!(cache.s_members("k").await.is_empty());
        assert_eq!(cache.z_card("k").await, 0);
        assert!(cache.ping().await);
        assert!(cache.check_rate_limit("k", 1, 1000).await);
    }
}
