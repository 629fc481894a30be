//! Client configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use cinetrack_infra::{ApiConfig, MetadataConfig, RateLimitConfig};

use crate::auth::AuthConfig;
use crate::movies::CacheConfig;
use crate::sync::SyncConfig;

/// Client configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    /// Directory for persisted state. `None` keeps everything in memory.
    pub storage_dir: Option<PathBuf>,
    pub auth: AuthConfig,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
    pub metadata: MetadataConfig,
    pub metadata_rate_limit: RateLimitConfig,
}

impl ClientConfig {
    /// Load configuration from `.env` and the process environment.
    pub fn load() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            parse(&lookup, key).map(Duration::from_secs).unwrap_or(default)
        };

        Self {
            api: ApiConfig {
                base_url: lookup("CINETRACK_API_URL").unwrap_or(defaults.api.base_url),
                timeout: secs("REQUEST_TIMEOUT_SECS", defaults.api.timeout),
            },
            storage_dir: lookup("CINETRACK_STORAGE_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            auth: AuthConfig {
                refresh_interval: secs(
                    "AUTH_REFRESH_INTERVAL_SECS",
                    defaults.auth.refresh_interval,
                ),
                refresh_threshold: secs(
                    "AUTH_REFRESH_THRESHOLD_SECS",
                    defaults.auth.refresh_threshold,
                ),
            },
            sync: SyncConfig {
                sync_interval: secs("SYNC_INTERVAL_SECS", defaults.sync.sync_interval),
            },
            cache: CacheConfig {
                list_ttl: secs("CACHE_LIST_TTL_SECS", defaults.cache.list_ttl),
                stats_ttl: secs("CACHE_STATS_TTL_SECS", defaults.cache.stats_ttl),
            },
            metadata: MetadataConfig {
                base_url: lookup("METADATA_API_URL").unwrap_or(defaults.metadata.base_url),
                api_key: lookup("METADATA_API_KEY").filter(|key| !key.is_empty()),
                timeout: defaults.metadata.timeout,
            },
            metadata_rate_limit: RateLimitConfig {
                max_requests: parse(&lookup, "METADATA_RATE_LIMIT_MAX")
                    .unwrap_or(defaults.metadata_rate_limit.max_requests),
                window: secs(
                    "METADATA_RATE_LIMIT_WINDOW_SECS",
                    defaults.metadata_rate_limit.window,
                ),
            },
        }
    }
}

/// Parse a variable, ignoring values that do not parse.
fn parse<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);

        assert_eq!(config.api.base_url, "http://localhost:3000/api");
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert!(config.storage_dir.is_none());
        assert_eq!(config.auth.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.auth.refresh_threshold, Duration::from_secs(600));
        assert_eq!(config.sync.sync_interval, Duration::from_secs(30));
        assert_eq!(config.cache.list_ttl, Duration::from_secs(300));
        assert_eq!(config.cache.stats_ttl, Duration::from_secs(600));
        assert_eq!(config.metadata_rate_limit.max_requests, 40);
        assert_eq!(config.metadata_rate_limit.window, Duration::from_secs(10));
        assert!(config.metadata.api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("CINETRACK_API_URL", "https://api.cinetrack.app"),
            ("CINETRACK_STORAGE_DIR", "/var/lib/cinetrack"),
            ("AUTH_REFRESH_INTERVAL_SECS", "60"),
            ("SYNC_INTERVAL_SECS", "5"),
            ("METADATA_API_KEY", "k1"),
            ("METADATA_RATE_LIMIT_MAX", "10"),
        ]);

        assert_eq!(config.api.base_url, "https://api.cinetrack.app");
        assert_eq!(config.storage_dir, Some(PathBuf::from("/var/lib/cinetrack")));
        assert_eq!(config.auth.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.sync.sync_interval, Duration::from_secs(5));
        assert_eq!(config.metadata.api_key.as_deref(), Some("k1"));
        assert_eq!(config.metadata_rate_limit.max_requests, 10);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = config(&[
            ("REQUEST_TIMEOUT_SECS", "soon"),
            ("CINETRACK_STORAGE_DIR", "  "),
        ]);

        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert!(config.storage_dir.is_none());
    }
}
