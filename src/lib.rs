pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;

pub use error::{AuthError, CacheError, CommonError};
pub type Result<T> = std::result::Result<T, CommonError>;
pub use config::Settings;

pub use auth::{
    generate_jwt, generate_jwt_with_ttl, verify_jwt, AuthDecision, AuthenticatedUser,
    Authenticator, Claims, CurrentUser,
};
pub use cache::{
    build_cache, Cache, CacheExt, ConnectionManager, ConnectionSettings, MemoryCache,
    RateLimiter, RedisCacheClient, SessionStore, StubCache,
};

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the process-wide tracing subscriber. Services call this once at
/// startup; calling it again (e.g. from tests) is a no-op.
pub fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
