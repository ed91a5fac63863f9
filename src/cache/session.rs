use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limit::RateLimiter;
use super::store::{Cache, CacheExt};

// Key namespace shared by every service talking to the same store. The
// prefixes must match exactly for cross-service interoperability.
const REFRESH_TOKEN_PREFIX: &str = "refresh_token:";
const USER_SESSIONS_PREFIX: &str = "user_sessions:";
const REFRESH_RATE_LIMIT_PREFIX: &str = "refresh_rate_limit:";

/// Default session lifetime: 30 days.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

pub const DEFAULT_REFRESH_RATE_LIMIT: u64 = 10;
pub const DEFAULT_REFRESH_RATE_WINDOW: Duration = Duration::from_secs(5 * 60);

const UNKNOWN_DEVICE: &str = "Unknown Device";

/// Metadata stored alongside a refresh token, keyed by the token itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRecord {
    pub user_id: String,
    pub device_info: String,
    pub expires_at: DateTime<Utc>,
}

/// One active session in a user's session registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub device_info: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user session registry and refresh-token metadata store.
///
/// Built entirely on the [`Cache`] contract: a session lives as a JSON
/// record under `user_sessions:<userId>:<sessionId>` plus a membership entry
/// in the set at `user_sessions:<userId>`. The store keeps the two
/// consistent; a dangling set member whose record is gone is treated as
/// absent when listing, never as an error.
pub struct SessionStore<C: Cache + Clone> {
    cache: C,
    refresh_limiter: RateLimiter<C>,
}

impl<C: Cache + Clone> SessionStore<C> {
    pub fn new(cache: C) -> Self {
        let refresh_limiter = RateLimiter::new(
            cache.clone(),
            REFRESH_RATE_LIMIT_PREFIX,
            DEFAULT_REFRESH_RATE_LIMIT,
            DEFAULT_REFRESH_RATE_WINDOW,
        );
        Self {
            cache,
            refresh_limiter,
        }
    }

    /// Cache refresh-token metadata with a TTL equal to the token's
    /// remaining lifetime. An already-expired (or expiring-now) token is
    /// never cached.
    pub async fn cache_refresh_token(
        &self,
        token: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
        device_info: Option<&str>,
    ) {
        let ttl = (expires_at - Utc::now()).num_seconds();
        if ttl <= 0 {
            debug!("Refresh token for user {} already expired, not caching", user_id);
            return;
        }

        let record = RefreshTokenRecord {
            user_id: user_id.to_string(),
            device_info: device_info.unwrap_or(UNKNOWN_DEVICE).to_string(),
            expires_at,
        };
        self.cache
            .set_json(
                &format!("{}{}", REFRESH_TOKEN_PREFIX, token),
                &record,
                Some(ttl as u64),
            )
            .await;
    }

    pub async fn get_refresh_token_data(&self, token: &str) -> Option<RefreshTokenRecord> {
        self.cache
            .get_json(&format!("{}{}", REFRESH_TOKEN_PREFIX, token))
            .await
    }

    /// Delete the token's record regardless of prior existence. Idempotent.
    pub async fn invalidate_refresh_token(&self, token: &str) {
        self.cache
            .del(&format!("{}{}", REFRESH_TOKEN_PREFIX, token))
            .await;
    }

    /// Register a session: write the per-session record, add the id to the
    /// user's session set, and refresh the set's own expiry to the same TTL.
    pub async fn add_user_session(
        &self,
        user_id: &str,
        session_id: &str,
        device_info: &str,
        ttl_seconds: Option<u64>,
    ) {
        let ttl = ttl_seconds.unwrap_or(DEFAULT_SESSION_TTL_SECONDS);
        let set_key = format!("{}{}", USER_SESSIONS_PREFIX, user_id);

        let record = SessionRecord {
            session_id: session_id.to_string(),
            device_info: device_info.to_string(),
            created_at: Utc::now(),
        };
        self.cache
            .set_json(&format!("{}:{}", set_key, session_id), &record, Some(ttl))
            .await;

        self.cache.s_add(&set_key, session_id).await;
        self.cache.expire(&set_key, ttl).await;
    }

    /// Remove a session from the registry. Both the set removal and the
    /// record delete are attempted even if one fails.
    pub async fn remove_user_session(&self, user_id: &str, session_id: &str) {
        let set_key = format!("{}{}", USER_SESSIONS_PREFIX, user_id);
        self.cache.s_rem(&set_key, session_id).await;
        self.cache.del(&format!("{}:{}", set_key, session_id)).await;
    }

    /// List the user's sessions with details. Set members whose record is
    /// missing (expired or deleted out-of-band) are silently skipped.
    pub async fn get_user_sessions(&self, user_id: &str) -> Vec<SessionRecord> {
        let set_key = format!("{}{}", USER_SESSIONS_PREFIX, user_id);
        let session_ids = self.cache.s_members(&set_key).await;

        let mut sessions = Vec::new();
        for session_id in session_ids {
            let record_key = format!("{}:{}", set_key, session_id);
            if let Some(record) = self.cache.get_json::<SessionRecord>(&record_key).await {
                sessions.push(record);
            }
        }
        sessions
    }

    /// Revoke every session for the user: batch-delete all session records,
    /// then delete the set key itself.
    pub async fn revoke_all_user_sessions(&self, user_id: &str) {
        let set_key = format!("{}{}", USER_SESSIONS_PREFIX, user_id);
        let session_ids = self.cache.s_members(&set_key).await;

        let deletes: Vec<BoxFuture<'_, bool>> = session_ids
            .iter()
            .map(|session_id| {
                let record_key = format!("{}:{}", set_key, session_id);
                let cache = &self.cache;
                async move { cache.del(&record_key).await }.boxed()
            })
            .collect();
        self.cache.multi(deletes).await;

        self.cache.del(&set_key).await;
    }

    /// Rate limit for token refresh attempts, under the dedicated
    /// `refresh_rate_limit:` prefix. Fail-closed like every rate limit.
    pub async fn check_refresh_rate_limit(&self, identifier: &str) -> bool {
        self.refresh_limiter.check(identifier).await
    }
}
