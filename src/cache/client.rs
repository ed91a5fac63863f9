use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use tracing::warn;

use crate::error::CacheError;

use super::connection::{ConnectionManager, ConnectionSettings};
use super::store::Cache;

/// Cache facade backed by the shared store.
///
/// Every operation acquires the process-wide connection through the
/// [`ConnectionManager`] and runs behind a safe-operation wrapper: any
/// failure is logged and mapped to the operation's documented fallback value
/// instead of propagating. Strict consistency is an explicit non-goal; an
/// outage degrades the features built on the cache (rate limiting, blacklist
/// checks, profile caching) rather than failing requests.
#[derive(Clone)]
pub struct RedisCacheClient {
    manager: Arc<ConnectionManager>,
}

impl RedisCacheClient {
    /// Build a client for the given endpoint. No I/O happens here; the
    /// connection is established lazily on first use, and an invalid URL
    /// surfaces as a connection failure (and therefore fallbacks) at that
    /// point.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            manager: Arc::new(ConnectionManager::new(url)),
        }
    }

    pub fn with_settings(url: impl Into<String>, settings: ConnectionSettings) -> Self {
        Self {
            manager: Arc::new(ConnectionManager::with_settings(url, settings)),
        }
    }

    pub fn with_manager(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Safe-operation combinator: run the command, and on any failure log it
    /// and substitute the fallback. Connection-class failures also reset the
    /// manager so the next call reconnects.
    async fn safe<T>(
        &self,
        operation: &str,
        fallback: T,
        fut: impl Future<Output = Result<T, CacheError>> + Send,
    ) -> T {
        match fut.await {
            Ok(value) => value,
            Err(err) => {
                warn!("Cache operation {} failed: {}", operation, err);
                if err.is_connection() {
                    self.manager.reset().await;
                }
                fallback
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCacheClient {
    async fn get(&self, key: &str) -> Option<String> {
        self.safe("GET", None, async {
            let mut conn = self.manager.get().await?;
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> bool {
        self.safe("SET", false, async {
            let mut conn = self.manager.get().await?;
            match ttl_seconds {
                Some(seconds) => {
                    let _: () = conn.set_ex(key, value, seconds).await?;
                }
                None => {
                    let _: () = conn.set(key, value).await?;
                }
            }
            Ok(true)
        })
        .await
    }

    async fn del(&self, key: &str) -> bool {
        self.safe("DEL", false, async {
            let mut conn = self.manager.get().await?;
            let removed: u64 = conn.del(key).await?;
            Ok(removed > 0)
        })
        .await
    }

    async fn exists(&self, key: &str) -> bool {
        self.safe("EXISTS", false, async {
            let mut conn = self.manager.get().await?;
            let present: bool = conn.exists(key).await?;
            Ok(present)
        })
        .await
    }

    async fn expire(&self, key: &str, seconds: u64) -> bool {
        self.safe("EXPIRE", false, async {
            let mut conn = self.manager.get().await?;
            let applied: bool = conn.expire(key, seconds as i64).await?;
            Ok(applied)
        })
        .await
    }

    async fn s_add(&self, key: &str, member: &str) -> u64 {
        self.safe("SADD", 0, async {
            let mut conn = self.manager.get().await?;
            let added: u64 = conn.sadd(key, member).await?;
            Ok(added)
        })
        .await
    }

    async fn s_members(&self, key: &str) -> Vec<String> {
        self.safe("SMEMBERS", Vec::new(), async {
            let mut conn = self.manager.get().await?;
            let members: Vec<String> = conn.smembers(key).await?;
            Ok(members)
        })
        .await
    }

    async fn s_rem(&self, key: &str, member: &str) -> u64 {
        self.safe("SREM", 0, async {
            let mut conn = self.manager.get().await?;
            let removed: u64 = conn.srem(key, member).await?;
            Ok(removed)
        })
        .await
    }

    async fn s_card(&self, key: &str) -> u64 {
        self.safe("SCARD", 0, async {
            let mut conn = self.manager.get().await?;
            let count: u64 = conn.scard(key).await?;
            Ok(count)
        })
        .await
    }

    async fn z_add(&self, key: &str, score: f64, member: &str) -> u64 {
        self.safe("ZADD", 0, async {
            let mut conn = self.manager.get().await?;
            let added: u64 = conn.zadd(key, member, score).await?;
            Ok(added)
        })
        .await
    }

    async fn z_card(&self, key: &str) -> u64 {
        self.safe("ZCARD", 0, async {
            let mut conn = self.manager.get().await?;
            let count: u64 = conn.zcard(key).await?;
            Ok(count)
        })
        .await
    }

    async fn z_rem_range_by_score(&self, key: &str, min: f64, max: f64) -> u64 {
        self.safe("ZREMRANGEBYSCORE", 0, async {
            let mut conn = self.manager.get().await?;
            let removed: u64 = conn.zrembyscore(key, min, max).await?;
            Ok(removed)
        })
        .await
    }

    async fn incr(&self, key: &str) -> i64 {
        self.safe("INCR", 0, async {
            let mut conn = self.manager.get().await?;
            let value: i64 = conn.incr(key, 1i64).await?;
            Ok(value)
        })
        .await
    }

    async fn ping(&self) -> bool {
        self.safe("PING", false, async {
            let mut conn = self.manager.get().await?;
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(pong == "PONG")
        })
        .await
    }

    /// Sliding-window rate limit. The whole sequence runs behind a single
    /// safe wrapper with fallback `false`: unlike every other operation this
    /// one fails closed, so a cache outage denies traffic instead of
    /// allowing unbounded throughput. Do not "fix" this into fail-open.
    async fn check_rate_limit(&self, key: &str, limit: u64, window_ms: u64) -> bool {
        self.safe("RATE_LIMIT", false, async {
            let mut conn = self.manager.get().await?;
            let now = Utc::now().timestamp_millis();
            let window_start = now - window_ms as i64;

            // Purge entries outside the window, then count this request
            // against the limit before reading the cardinality.
            let _purged: u64 = conn.zrembyscore(key, 0, window_start).await?;
            let member = format!("{}-{}", now, rand::random::<u32>());
            let _added: u64 = conn.zadd(key, member, now).await?;
            let count: u64 = conn.zcard(key).await?;
            let _applied: bool = conn.expire(key, window_ms.div_ceil(1000) as i64).await?;

            Ok(count <= limit)
        })
        .await
    }
}
