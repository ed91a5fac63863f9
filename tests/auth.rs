use std::sync::Arc;

use actix_web::{test, web, FromRequest, HttpMessage};
use serde_json::json;
use service_common::auth::ClearSession;
use service_common::cache::{Cache, CacheExt, MemoryCache};
use service_common::{generate_jwt, verify_jwt, Authenticator, CurrentUser};

const SECRET: &str = "test_secret";

fn authenticator() -> (Arc<MemoryCache>, Authenticator) {
    let cache = Arc::new(MemoryCache::new());
    let auth = Authenticator::new(Arc::clone(&cache) as Arc<dyn Cache>, SECRET);
    (cache, auth)
}

#[tokio::test]
async fn test_request_without_token_is_anonymous() {
    let (_cache, auth) = authenticator();
    let decision = auth.authenticate(None).await;
    assert!(decision.user.is_none());
    assert!(!decision.clear_session);
}

#[tokio::test]
async fn test_valid_token_fills_profile_cache() {
    let (cache, auth) = authenticator();
    let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();

    let decision = auth.authenticate(Some(&token)).await;
    let user = decision.user.expect("should authenticate");
    assert_eq!(user.id, "user-1");
    assert_eq!(user.email, "user@example.com");

    // The opportunistic fill stores the token payload for next time.
    let cached: serde_json::Value = cache.get_json("user:user-1").await.unwrap();
    assert_eq!(cached["email"], "user@example.com");
}

#[tokio::test]
async fn test_cached_profile_takes_precedence() {
    let (cache, auth) = authenticator();
    let token = generate_jwt("user-1", "stale@example.com", SECRET).unwrap();

    cache
        .set_json(
            "user:user-1",
            &json!({"email": "fresh@example.com", "displayName": "Fresh"}),
            Some(300),
        )
        .await;

    let decision = auth.authenticate(Some(&token)).await;
    let user = decision.user.expect("should authenticate");
    assert_eq!(user.id, "user-1");
    assert_eq!(user.email, "fresh@example.com");
    assert_eq!(user.extra["displayName"], "Fresh");
}

#[tokio::test]
async fn test_blacklisted_token_clears_session() {
    let (_cache, auth) = authenticator();
    let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();
    let claims = verify_jwt(&token, SECRET).unwrap();

    assert!(auth.blacklist_token(&claims.jti, 900).await);

    let decision = auth.authenticate(Some(&token)).await;
    assert!(decision.user.is_none());
    assert!(decision.clear_session);
}

#[tokio::test]
async fn test_extractor_with_bearer_token() {
    let (_cache, auth) = authenticator();
    let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();

    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .app_data(web::Data::new(auth))
        .to_http_request();

    let current = CurrentUser::extract(&req).await.unwrap();
    let user = current.0.expect("should authenticate");
    assert_eq!(user.id, "user-1");
    assert!(req.extensions().get::<ClearSession>().is_none());
}

#[tokio::test]
async fn test_extractor_without_token_is_anonymous() {
    let (_cache, auth) = authenticator();

    let req = test::TestRequest::default()
        .app_data(web::Data::new(auth))
        .to_http_request();

    let current = CurrentUser::extract(&req).await.unwrap();
    assert!(current.0.is_none());
}

#[tokio::test]
async fn test_extractor_flags_blacklisted_session() {
    let (_cache, auth) = authenticator();
    let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();
    let claims = verify_jwt(&token, SECRET).unwrap();
    auth.blacklist_token(&claims.jti, 900).await;

    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .app_data(web::Data::new(auth))
        .to_http_request();

    let current = CurrentUser::extract(&req).await.unwrap();
    assert!(current.0.is_none());
    assert!(req.extensions().get::<ClearSession>().is_some());
}
