//! Centralized configuration for Trawl.
//!
//! All tunable parameters are defined here to avoid hard-coded values
//! scattered throughout the search pipeline and the API server.

use std::path::PathBuf;
use std::time::Duration;

use crate::mode::FetchMode;

/// Central configuration for all Trawl components.
///
/// Groups related settings into logical sections. Supports environment
/// variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct TrawlConfig {
    pub mode: FetchMode,
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
}

/// Aggregated search behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Overall deadline for one aggregated search (None = wait for every source)
    pub deadline: Option<Duration>,
    /// Accept blank queries when running against fixtures
    pub allow_empty_query_in_mock: bool,
    /// Driver catalogue loaded at startup
    pub drivers_file: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            deadline: None,
            allow_empty_query_in_mock: false,
            drivers_file: PathBuf::from("drivers.json"),
        }
    }
}

/// Network retrieval and fixture lookup configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-request timeout for live fetches
    pub timeout: Duration,
    /// User agent sent to source sites
    pub user_agent: String,
    /// Root directory holding mock-mode fixtures
    pub fixtures_dir: PathBuf,
    pub retry: RetryConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
                .to_string(),
            fixtures_dir: PathBuf::from("fixtures"),
            retry: RetryConfig::default(),
        }
    }
}

/// Backoff parameters for retryable fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, doubled on every further retry
    pub base_delay: Duration,
    /// Upper bound for a single backoff delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Result cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Freshness window for cached search payloads
    pub ttl: Duration,
    /// Interval of the background sweep removing stale entries (None = never)
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300), // 5 minutes
            sweep_interval: Some(Duration::from_secs(600)),
        }
    }
}

/// HTTP API server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Socket address string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TrawlConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparsable values are ignored with a warning and the default is kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("TRAWL_MOCK_MODE") {
            match FetchMode::from_switch(&value) {
                Some(mode) => config.mode = mode,
                None => warn_invalid("TRAWL_MOCK_MODE", &value),
            }
        }

        if let Some(dir) = lookup("TRAWL_FIXTURES_DIR") {
            config.fetch.fixtures_dir = PathBuf::from(dir);
        }

        if let Some(seconds) = parse_number::<u64>(&lookup, "TRAWL_FETCH_TIMEOUT_SECS") {
            config.fetch.timeout = Duration::from_secs(seconds);
        }

        if let Some(attempts) = parse_number::<u32>(&lookup, "TRAWL_FETCH_MAX_ATTEMPTS") {
            config.fetch.retry.max_attempts = attempts.max(1);
        }

        if let Some(millis) = parse_number::<u64>(&lookup, "TRAWL_FETCH_RETRY_BASE_MS") {
            config.fetch.retry.base_delay = Duration::from_millis(millis);
        }

        if let Some(agent) = lookup("TRAWL_USER_AGENT") {
            config.fetch.user_agent = agent;
        }

        if let Some(seconds) = parse_number::<u64>(&lookup, "TRAWL_CACHE_TTL_SECS") {
            config.cache.ttl = Duration::from_secs(seconds);
        }

        if let Some(seconds) = parse_number::<u64>(&lookup, "TRAWL_SEARCH_DEADLINE_SECS") {
            config.search.deadline = (seconds > 0).then(|| Duration::from_secs(seconds));
        }

        if let Some(value) = lookup("TRAWL_ALLOW_EMPTY_QUERY") {
            match value.trim().parse::<bool>() {
                Ok(allow) => config.search.allow_empty_query_in_mock = allow,
                Err(_) => warn_invalid("TRAWL_ALLOW_EMPTY_QUERY", &value),
            }
        }

        if let Some(path) = lookup("TRAWL_DRIVERS_FILE") {
            config.search.drivers_file = PathBuf::from(path);
        }

        if let Some(host) = lookup("TRAWL_HOST") {
            config.server.host = host;
        }

        if let Some(port) = parse_number::<u16>(&lookup, "TRAWL_PORT") {
            config.server.port = port;
        }

        config
    }

    /// Configuration for fast deterministic tests: mock mode, no retry delay.
    pub fn for_testing() -> Self {
        let mut config = Self {
            mode: FetchMode::Mock,
            ..Self::default()
        };
        config.fetch.timeout = Duration::from_secs(2);
        config.fetch.retry = RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        };
        config.cache.sweep_interval = None;
        config
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn_invalid(key, &raw);
            None
        }
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!("Ignoring invalid value '{}' for {}", value, key);
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TrawlConfig::default();
        assert_eq!(config.mode, FetchMode::Live);
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.fetch.timeout, Duration::from_secs(15));
        assert_eq!(config.fetch.retry.max_attempts, 3);
        assert_eq!(config.server.bind_address(), "127.0.0.1:3000");
        assert!(config.search.deadline.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = TrawlConfig::from_lookup(lookup_from(&[
            ("TRAWL_MOCK_MODE", "true"),
            ("TRAWL_CACHE_TTL_SECS", "60"),
            ("TRAWL_FETCH_MAX_ATTEMPTS", "5"),
            ("TRAWL_SEARCH_DEADLINE_SECS", "20"),
            ("TRAWL_PORT", "8080"),
            ("TRAWL_FIXTURES_DIR", "/tmp/fixtures"),
        ]));

        assert!(config.mode.is_mock());
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.fetch.retry.max_attempts, 5);
        assert_eq!(config.search.deadline, Some(Duration::from_secs(20)));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.fetch.fixtures_dir, PathBuf::from("/tmp/fixtures"));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = TrawlConfig::from_lookup(lookup_from(&[
            ("TRAWL_MOCK_MODE", "perhaps"),
            ("TRAWL_CACHE_TTL_SECS", "soon"),
            ("TRAWL_PORT", "99999"),
            ("TRAWL_FETCH_MAX_ATTEMPTS", "0"),
        ]));

        assert!(config.mode.is_live());
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.fetch.retry.max_attempts, 1);
    }

    #[test]
    fn test_zero_deadline_disables_it() {
        let config =
            TrawlConfig::from_lookup(lookup_from(&[("TRAWL_SEARCH_DEADLINE_SECS", "0")]));
        assert!(config.search.deadline.is_none());
    }
}
