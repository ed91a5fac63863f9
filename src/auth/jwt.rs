use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Default access-token lifetime.
pub const TOKEN_TTL_MINUTES: i64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub email: String,
    /// Token id, referenced by the blacklist on logout.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a token for the given identity with the default 15 minute expiry.
/// Each token gets a fresh random `jti` so it can be blacklisted
/// individually before its natural expiry.
pub fn generate_jwt(id: &str, email: &str, secret: &str) -> Result<String, AuthError> {
    generate_jwt_with_ttl(id, email, secret, Duration::minutes(TOKEN_TTL_MINUTES))
}

/// Sign a token with a caller-chosen lifetime (services wire
/// `settings.auth.token_expiry_minutes` through here).
pub fn generate_jwt_with_ttl(
    id: &str,
    email: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        id: id.to_string(),
        email: email.to_string(),
        jti: Uuid::new_v4().simple().to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify signature and expiry, returning the claims.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret";

    #[test]
    fn test_roundtrip() {
        let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();
        let claims = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.id, "user-1");
        assert_eq!(claims.email, "user@example.com");
        assert!(!claims.jti.is_empty());
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_MINUTES * 60);
    }

    #[test]
    fn test_jti_is_unique_per_token() {
        let first = verify_jwt(&generate_jwt("u", "u@e.com", SECRET).unwrap(), SECRET).unwrap();
        let second = verify_jwt(&generate_jwt("u", "u@e.com", SECRET).unwrap(), SECRET).unwrap();
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = generate_jwt("user-1", "user@example.com", SECRET).unwrap();
        let err = verify_jwt(&token, "other_secret").unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Lifetime far enough in the past to clear the default 60s leeway.
        let token =
            generate_jwt_with_ttl("user-1", "user@example.com", SECRET, Duration::minutes(-5))
                .unwrap();
        let err = verify_jwt(&token, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = verify_jwt("not.a.token", SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
