use std::sync::Arc;

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::auth::jwt::{verify_jwt, Claims};
use crate::cache::{Cache, CacheExt};
use crate::error::AuthError;

const BLACKLIST_PREFIX: &str = "blacklist:";
const USER_PROFILE_PREFIX: &str = "user:";
const USER_PROFILE_TTL_SECONDS: u64 = 300;

/// The identity attached to an authenticated request: token claims merged
/// with any cached profile fields (cached fields win on conflict). Fields
/// beyond the token's own end up in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub jti: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of the per-request authentication pipeline. `user` is `None` for
/// anonymous requests; `clear_session` is set when the request carried a
/// blacklisted token and the HTTP layer should drop the session cookie.
#[derive(Debug, Default)]
pub struct AuthDecision {
    pub user: Option<AuthenticatedUser>,
    pub clear_session: bool,
}

/// Request-time authentication pipeline: token verification, blacklist
/// check, and an opportunistic profile-cache lookup/fill.
///
/// No failure in this pipeline is ever surfaced to the request. A missing,
/// malformed, expired or blacklisted token simply yields an anonymous
/// decision; rejecting anonymous requests is downstream access control's
/// job.
pub struct Authenticator {
    cache: Arc<dyn Cache>,
    jwt_secret: String,
}

impl Authenticator {
    pub fn new(cache: Arc<dyn Cache>, jwt_secret: impl Into<String>) -> Self {
        Self {
            cache,
            jwt_secret: jwt_secret.into(),
        }
    }

    pub async fn authenticate(&self, token: Option<&str>) -> AuthDecision {
        match self.resolve(token).await {
            Ok(user) => AuthDecision {
                user: Some(user),
                clear_session: false,
            },
            Err(AuthError::Blacklisted) => AuthDecision {
                user: None,
                clear_session: true,
            },
            Err(AuthError::MissingToken) => AuthDecision::default(),
            Err(err) => {
                debug!("Token verification failed ({}), continuing as anonymous", err);
                AuthDecision::default()
            }
        }
    }

    /// Resolve a token to an identity, naming the exact rejection cause.
    async fn resolve(&self, token: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        let claims = verify_jwt(token, &self.jwt_secret)?;

        if self.is_blacklisted(&claims.jti).await {
            info!("Token {} is blacklisted", claims.jti);
            return Err(AuthError::Blacklisted);
        }

        let profile_key = format!("{}{}", USER_PROFILE_PREFIX, claims.id);
        match self.cache.get_json::<Map<String, Value>>(&profile_key).await {
            Some(cached) => {
                debug!("User {} loaded from cache", claims.id);
                Ok(merge_identity(&claims, cached))
            }
            None => {
                debug!("User {} not in cache, using token payload", claims.id);
                // Opportunistic fill for subsequent requests; a write failure
                // must not fail this request.
                self.cache
                    .set_json(&profile_key, &claims, Some(USER_PROFILE_TTL_SECONDS))
                    .await;
                Ok(merge_identity(&claims, Map::new()))
            }
        }
    }

    pub async fn is_blacklisted(&self, jti: &str) -> bool {
        let value = self.cache.get(&format!("{}{}", BLACKLIST_PREFIX, jti)).await;
        value.as_deref() == Some("1")
    }

    /// Invalidate a token before its natural expiry (logout). The entry's
    /// TTL should be the token's remaining lifetime, after which the token
    /// rejects itself anyway.
    pub async fn blacklist_token(&self, jti: &str, ttl_seconds: u64) -> bool {
        self.cache
            .set(&format!("{}{}", BLACKLIST_PREFIX, jti), "1", Some(ttl_seconds))
            .await
    }
}

/// Overlay cached profile fields on the token claims; cached fields take
/// precedence on conflict. Falls back to the claims alone if the cached
/// blob breaks the identity shape.
fn merge_identity(claims: &Claims, cached: Map<String, Value>) -> AuthenticatedUser {
    let mut merged = match serde_json::to_value(claims) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for (key, value) in cached {
        merged.insert(key, value);
    }

    match serde_json::from_value(Value::Object(merged)) {
        Ok(user) => user,
        Err(err) => {
            warn!(
                "Cached profile for user {} has an invalid shape ({}), using token payload",
                claims.id, err
            );
            AuthenticatedUser {
                id: claims.id.clone(),
                email: claims.email.clone(),
                jti: claims.jti.clone(),
                extra: Map::new(),
            }
        }
    }
}

/// Marker inserted into request extensions when a blacklisted token was
/// seen; the HTTP layer uses it to drop the session cookie.
#[derive(Debug, Clone, Copy)]
pub struct ClearSession;

/// Extractor consumed by the HTTP layer: `CurrentUser(None)` for anonymous
/// requests, never an error. Reads the bearer token from the Authorization
/// header or the `session` cookie and runs it through the [`Authenticator`]
/// registered as app data.
pub struct CurrentUser(pub Option<AuthenticatedUser>);

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let Some(authenticator) = req.app_data::<web::Data<Authenticator>>() else {
                warn!("Authenticator not registered as app data, treating request as anonymous");
                return Ok(CurrentUser(None));
            };

            let token = extract_token(&req);
            let decision = authenticator.authenticate(token.as_deref()).await;
            if decision.clear_session {
                req.extensions_mut().insert(ClearSession);
            }
            Ok(CurrentUser(decision.user))
        })
    }
}

fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        if let Ok(raw) = value.to_str() {
            if let Some(token) = raw.strip_prefix("Bearer ") {
                return Some(token.to_owned());
            }
        }
    }
    req.cookie("session").map(|cookie| cookie.value().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_jwt;
    use crate::cache::MockCache;

    const SECRET: &str = "test_secret";

    #[tokio::test]
    async fn test_no_token_is_anonymous() {
        let authenticator = Authenticator::new(Arc::new(MockCache::new()), SECRET);
        let decision = authenticator.authenticate(None).await;
        assert!(decision.user.is_none());
        assert!(!decision.clear_session);
    }

    #[tokio::test]
    async fn test_invalid_token_is_silently_anonymous() {
        let authenticator = Authenticator::new(Arc::new(MockCache::new()), SECRET);
        let decision = authenticator.authenticate(Some("garbage")).await;
        assert!(decision.user.is_none());
        assert!(!decision.clear_session);
    }

    #[tokio::test]
    async fn test_resolve_names_the_rejection_cause() {
        let authenticator = Authenticator::new(Arc::new(MockCache::new()), SECRET);
        assert!(matches!(
            authenticator.resolve(None).await,
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            authenticator.resolve(Some("garbage")).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_blacklisted_token() {
        let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();

        let mut cache = MockCache::new();
        cache
            .expect_get()
            .withf(|key| key.starts_with(BLACKLIST_PREFIX))
            .returning(|_| Some("1".to_string()));
        let authenticator = Authenticator::new(Arc::new(cache), SECRET);

        assert!(matches!(
            authenticator.resolve(Some(&token)).await,
            Err(AuthError::Blacklisted)
        ));
    }

    #[tokio::test]
    async fn test_blacklisted_token_clears_session() {
        let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();

        let mut cache = MockCache::new();
        cache
            .expect_get()
            .withf(|key| key.starts_with(BLACKLIST_PREFIX))
            .returning(|_| Some("1".to_string()));
        let authenticator = Authenticator::new(Arc::new(cache), SECRET);

        let decision = authenticator.authenticate(Some(&token)).await;
        assert!(decision.user.is_none());
        assert!(decision.clear_session);
    }

    #[tokio::test]
    async fn test_cache_miss_uses_payload_and_fills_cache() {
        let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();

        let mut cache = MockCache::new();
        // No blacklist entry, no cached profile.
        cache.expect_get().returning(|_| None);
        cache
            .expect_set()
            .withf(|key, _, ttl| key == "user:user-1" && *ttl == Some(300))
            .times(1)
            .returning(|_, _, _| true);
        let authenticator = Authenticator::new(Arc::new(cache), SECRET);

        let decision = authenticator.authenticate(Some(&token)).await;
        let user = decision.user.expect("should authenticate");
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email, "user@example.com");
        assert!(!decision.clear_session);
    }

    #[tokio::test]
    async fn test_cached_fields_take_precedence() {
        let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();

        let mut cache = MockCache::new();
        cache
            .expect_get()
            .withf(|key| key.starts_with(BLACKLIST_PREFIX))
            .returning(|_| None);
        cache
            .expect_get()
            .withf(|key| key.starts_with(USER_PROFILE_PREFIX))
            .returning(|_| {
                Some(r#"{"email":"fresh@example.com","displayName":"Fresh"}"#.to_string())
            });
        let authenticator = Authenticator::new(Arc::new(cache), SECRET);

        let decision = authenticator.authenticate(Some(&token)).await;
        let user = decision.user.expect("should authenticate");
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email, "fresh@example.com");
        assert_eq!(
            user.extra.get("displayName"),
            Some(&Value::String("Fresh".to_string()))
        );
    }

    #[tokio::test]
    async fn test_profile_cache_write_failure_does_not_fail_request() {
        let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();

        let mut cache = MockCache::new();
        cache.expect_get().returning(|_| None);
        cache.expect_set().returning(|_, _, _| false);
        let authenticator = Authenticator::new(Arc::new(cache), SECRET);

        let decision = authenticator.authenticate(Some(&token)).await;
        assert!(decision.user.is_some());
    }
}
