use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Endpoint of the shared key-value store.
    pub url: String,
    /// When set, the no-op in-memory stub is wired in instead of a real
    /// connection; every operation succeeds trivially. Used by isolated test
    /// runs to avoid network calls.
    pub test_mode: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default values
            .set_default("environment", "development")?
            .set_default("cache.url", "redis://redis-srv:6379")?
            .set_default("cache.test_mode", false)?
            .set_default("auth.jwt_secret", "development_secret")?
            .set_default("auth.token_expiry_minutes", 15)?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in settings from environment variables (with prefix "APP_")
            // E.g., `APP_CACHE__URL=redis://localhost:6379` sets `Settings.cache.url`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    #[cfg(test)]
    pub fn new_for_test() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("environment", "test")?
            .set_default("cache.url", "redis://localhost:6379")?
            .set_default("cache.test_mode", true)?
            .set_default("auth.jwt_secret", "test_secret")?
            .set_default("auth.token_expiry_minutes", 15)?
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn cleanup_env() {
        env::remove_var("APP_ENVIRONMENT");
        env::remove_var("APP_CACHE__URL");
        env::remove_var("APP_CACHE__TEST_MODE");
        env::remove_var("APP_AUTH__JWT_SECRET");
        env::remove_var("APP_AUTH__TOKEN_EXPIRY_MINUTES");
    }

    #[test]
    fn test_settings_defaults() {
        cleanup_env();
        let settings = Settings::new_for_test().expect("Failed to load settings");
        assert_eq!(settings.environment, "test");
        assert_eq!(settings.cache.url, "redis://localhost:6379");
        assert!(settings.cache.test_mode);
        assert_eq!(settings.auth.jwt_secret, "test_secret");
        assert_eq!(settings.auth.token_expiry_minutes, 15);
    }

    #[test]
    fn test_environment_override() {
        cleanup_env();

        env::set_var("APP_ENVIRONMENT", "test");
        env::set_var("APP_CACHE__URL", "redis://cache-host:7000");
        env::set_var("APP_CACHE__TEST_MODE", "false");
        env::set_var("APP_AUTH__JWT_SECRET", "override_secret");
        env::set_var("APP_AUTH__TOKEN_EXPIRY_MINUTES", "30");

        let settings = Config::builder()
            .set_default("environment", "test").unwrap()
            .set_default("cache.url", "redis://localhost:6379").unwrap()
            .set_default("cache.test_mode", true).unwrap()
            .set_default("auth.jwt_secret", "test_secret").unwrap()
            .set_default("auth.token_expiry_minutes", 15).unwrap()
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .expect("Failed to build config")
            .try_deserialize::<Settings>()
            .expect("Failed to deserialize settings");

        assert_eq!(settings.cache.url, "redis://cache-host:7000");
        assert!(!settings.cache.test_mode);
        assert_eq!(settings.auth.jwt_secret, "override_secret");
        assert_eq!(settings.auth.token_expiry_minutes, 30);

        cleanup_env();
    }
}
