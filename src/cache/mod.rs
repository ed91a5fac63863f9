pub mod client;
pub mod connection;
pub mod memory;
pub mod rate_limit;
pub mod session;
pub mod store;
pub mod stub;

use std::sync::Arc;

use tracing::info;

use crate::config::Settings;

pub use client::RedisCacheClient;
pub use connection::{ConnectionManager, ConnectionSettings};
pub use memory::MemoryCache;
pub use rate_limit::RateLimiter;
pub use session::{
    RefreshTokenRecord, SessionRecord, SessionStore, DEFAULT_REFRESH_RATE_LIMIT,
    DEFAULT_REFRESH_RATE_WINDOW, DEFAULT_SESSION_TTL_SECONDS,
};
pub use store::{Cache, CacheExt};
pub use stub::StubCache;

#[cfg(test)]
pub use store::MockCache;

/// Production wiring: pick the backend the settings ask for. Test mode
/// substitutes the no-op stub so isolated runs never touch the network.
pub fn build_cache(settings: &Settings) -> Arc<dyn Cache> {
    if settings.cache.test_mode {
        info!("Cache test mode enabled, using no-op stub backend");
        Arc::new(StubCache)
    } else {
        Arc::new(RedisCacheClient::new(settings.cache.url.clone()))
    }
}
