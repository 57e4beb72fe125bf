//! Application configuration loaded from environment variables.

use std::time::Duration;

use checkout::RetryPolicy;
use inventory_store::GovernorConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` (default `"0.0.0.0"`), `PORT` (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `DATABASE_URL`: SQLite database (default `"sqlite://inventory.db"`)
/// - `DB_BUSY_TIMEOUT_MS` (default `5000`), `DB_MAX_CONNECTIONS` (default `1`)
/// - `CHECKOUT_MAX_RETRIES` (default `3`), `CHECKOUT_RETRY_DELAY_MS` (default `2`)
///
/// Unparseable numbers fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: String,
    pub busy_timeout_ms: u64,
    pub max_connections: u32,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

const DEFAULT_DATABASE_URL: &str = "sqlite://inventory.db";

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: number("PORT").map_or(defaults.port, |p: u64| {
                u16::try_from(p).unwrap_or(defaults.port)
            }),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            busy_timeout_ms: number("DB_BUSY_TIMEOUT_MS").unwrap_or(defaults.busy_timeout_ms),
            max_connections: number("DB_MAX_CONNECTIONS").map_or(defaults.max_connections, |n: u64| {
                u32::try_from(n).unwrap_or(defaults.max_connections)
            }),
            max_retries: number("CHECKOUT_MAX_RETRIES").map_or(defaults.max_retries, |n: u64| {
                u32::try_from(n).unwrap_or(defaults.max_retries)
            }),
            retry_delay_ms: number("CHECKOUT_RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Storage settings for the governor. Validation happens when the
    /// governor is built.
    pub fn governor_config(&self) -> GovernorConfig {
        GovernorConfig::new(self.database_url.clone())
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .with_max_connections(self.max_connections)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            busy_timeout_ms: 5000,
            max_connections: 1,
            max_retries: RetryPolicy::DEFAULT_MAX_RETRIES,
            retry_delay_ms: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use inventory_store::{JournalMode, SyncMode};

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.database_url, "sqlite://inventory.db");
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 2);
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("DB_BUSY_TIMEOUT_MS", "250"),
            ("CHECKOUT_MAX_RETRIES", "7"),
            ("CHECKOUT_RETRY_DELAY_MS", "0"),
        ]);
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.busy_timeout_ms, 250);
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.retry_delay_ms, 0);
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = from_pairs(&[("PORT", "99999"), ("DB_MAX_CONNECTIONS", "many")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_connections, 1);
    }

    #[test]
    fn test_governor_config_keeps_single_writer_pragmas() {
        let governor = from_pairs(&[("DB_BUSY_TIMEOUT_MS", "1500")]).governor_config();
        assert_eq!(governor.busy_timeout, Duration::from_millis(1500));
        assert_eq!(governor.max_connections, 1);
        assert_eq!(governor.journal_mode, JournalMode::Wal);
        assert_eq!(governor.synchronous, SyncMode::Normal);
    }

    #[test]
    fn test_retry_policy() {
        let policy = from_pairs(&[("CHECKOUT_MAX_RETRIES", "5")]).retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.retry_delay, Duration::from_millis(2));
        assert_eq!(policy.max_attempts(), 6);
    }
}
