use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Contract shared by every cache backend.
///
/// Implementations never surface errors: each operation has a documented
/// fallback value returned on any failure (connect failure or command error),
/// so a cache outage degrades functionality instead of crashing the caller.
/// Fallbacks: `get` -> `None`, `set`/`del`/`exists`/`expire` -> `false`,
/// count and cardinality operations -> `0`, `s_members` -> empty, `ping` ->
/// `false`.
///
/// The one deliberate exception is `check_rate_limit`, which fails *closed*:
/// a cache outage denies traffic rather than allowing unbounded throughput.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> bool;
    async fn del(&self, key: &str) -> bool;
    async fn exists(&self, key: &str) -> bool;
    async fn expire(&self, key: &str, seconds: u64) -> bool;

    async fn s_add(&self, key: &str, member: &str) -> u64;
    async fn s_members(&self, key: &str) -> Vec<String>;
    async fn s_rem(&self, key: &str, member: &str) -> u64;
    async fn s_card(&self, key: &str) -> u64;

    async fn z_add(&self, key: &str, score: f64, member: &str) -> u64;
    async fn z_card(&self, key: &str) -> u64;
    async fn z_rem_range_by_score(&self, key: &str, min: f64, max: f64) -> u64;

    async fn incr(&self, key: &str) -> i64;
    async fn ping(&self) -> bool;

    /// Sliding-window rate limit check. Counts the current request against
    /// the limit (the Nth request in the window is the last one allowed).
    /// Fail-closed: any underlying failure yields `false`.
    async fn check_rate_limit(&self, key: &str, limit: u64, window_ms: u64) -> bool;
}

/// Typed conveniences layered over the raw [`Cache`] contract.
#[async_trait]
pub trait CacheExt: Cache {
    /// Fetch and deserialize a JSON value. A decode failure is treated the
    /// same as a miss, never an error.
    async fn get_json<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Failed to parse cached JSON at {}: {}", key, err);
                None
            }
        }
    }

    /// Serialize and store a JSON value, optionally with a TTL.
    async fn set_json<T>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> bool
    where
        T: Serialize + Sync,
    {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl_seconds).await,
            Err(err) => {
                warn!("Failed to encode value for cache key {}: {}", key, err);
                false
            }
        }
    }

    /// Run a sequence of independent operations in order, collecting their
    /// results. This is a convenience batch, not a transaction: each
    /// operation is already failure-isolated by the facade's fallbacks, and
    /// one result never aborts the rest.
    async fn multi<'a, T>(&self, operations: Vec<BoxFuture<'a, T>>) -> Vec<T>
    where
        T: Send + 'a,
    {
        let mut results = Vec::with_capacity(operations.len());
        for operation in operations {
            results.push(operation.await);
        }
        results
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}

#[async_trait]
impl<C: Cache + ?Sized> Cache for Arc<C> {
    async fn get(&self, key: &str) -> Option<String> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> bool {
        (**self).set(key, value, ttl_seconds).await
    }

    async fn del(&self, key: &str) -> bool {
        (**self).del(key).await
    }

    async fn exists(&self, key: &str) -> bool {
        (**self).exists(key).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> bool {
        (**self).expire(key, seconds).await
    }

    async fn s_add(&self, key: &str, member: &str) -> u64 {
        (**self).s_add(key, member).await
    }

    async fn s_members(&self, key: &str) -> Vec<String> {
        (**self).s_members(key).await
    }

    async fn s_rem(&self, key: &str, member: &str) -> u64 {
        (**self).s_rem(key, member).await
    }

    async fn s_card(&self, key: &str) -> u64 {
        (**self).s_card(key).await
    }

    async fn z_add(&self, key: &str, score: f64, member: &str) -> u64 {
        (**self).z_add(key, score, member).await
    }

    async fn z_card(&self, key: &str) -> u64 {
        (**self).z_card(key).await
    }

    async fn z_rem_range_by_score(&self, key: &str, min: f64, max: f64) -> u64 {
        (**self).z_rem_range_by_score(key, min, max).await
    }

    async fn incr(&self, key: &str) -> i64 {
        (**self).incr(key).await
    }

    async fn ping(&self) -> bool {
        (**self).ping().await
    }

    async fn check_rate_limit(&self, key: &str, limit: u64, window_ms: u64) -> bool {
        (**self).check_rate_limit(key, limit, window_ms).await
    }
}
