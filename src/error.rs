use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Cache error: {0}")]
    CacheError(#[from] CacheError),

    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<config::ConfigError> for CommonError {
    fn from(err: config::ConfigError) -> Self {
        CommonError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        CommonError::InternalError(err.to_string())
    }
}

// Implement actix_web::ResponseError for CommonError
impl ResponseError for CommonError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = self.to_string();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "message": message
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            CommonError::AuthError(_) => StatusCode::UNAUTHORIZED,
            CommonError::CacheError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CommonError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CommonError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures inside the cache subsystem. These never escape to request
/// handlers: the client facade catches them and substitutes each operation's
/// documented fallback value.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Raised only by the connection manager, when the reconnect budget is
    /// exhausted or a waited-on connection attempt was abandoned.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// An individual command failed after a connection existed.
    #[error("Operation error: {0}")]
    OperationError(String),

    /// JSON encode/decode failure; treated as a cache miss by callers.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CacheError {
    pub fn is_connection(&self) -> bool {
        matches!(self, CacheError::ConnectionError(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
            CacheError::ConnectionError(err.to_string())
        } else {
            CacheError::OperationError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::SerializationError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Missing token")]
    MissingToken,

    #[error("Token is blacklisted")]
    Blacklisted,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}
