//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default CDN base for poster and backdrop images.
pub const DEFAULT_CDN_BASE: &str = "https://image.tmdb.org/t/p";

/// Default path served whenever an image path is missing.
pub const DEFAULT_PLACEHOLDER_PATH: &str = "/images/placeholder.svg";

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the resource cache can hold
    pub max_entries: usize,
    /// Age in seconds after which a cached URL is recomputed
    pub cache_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL every image path is appended to
    pub cdn_base: String,
    /// Returned when no image path is available
    pub placeholder_path: String,
    /// Maximum lazy loads in flight at once
    pub max_concurrent_loads: usize,
    /// Pause before each lazy activation, in milliseconds
    pub load_delay_ms: u64,
    /// Per-item preload timeout, in milliseconds
    pub preload_timeout_ms: u64,
    /// Anti-flicker window for opposite collection mutations, in seconds
    pub suppression_window: u64,
    /// Directory backing the durable key-value store
    pub storage_dir: PathBuf,
    /// Remote endpoint offline operations are replayed against
    pub sync_url: Option<String>,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL` - URL staleness threshold in seconds (default: 86400)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CDN_BASE` - Image CDN base URL (default: TMDB)
    /// - `PLACEHOLDER_PATH` - Fallback image path
    /// - `MAX_CONCURRENT_LOADS` - Lazy loads in flight (default: 3)
    /// - `LOAD_DELAY_MS` - Delay before each lazy activation (default: 50)
    /// - `PRELOAD_TIMEOUT_MS` - Per-item preload timeout (default: 10000)
    /// - `SUPPRESSION_WINDOW` - Anti-flicker window in seconds (default: 30)
    /// - `STORAGE_DIR` - Durable store directory (default: .media_cache)
    /// - `SYNC_URL` - Replay endpoint (default: unset, replay disabled)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            cache_ttl: parse_var("CACHE_TTL").unwrap_or(defaults.cache_ttl),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cdn_base: env::var("CDN_BASE").unwrap_or(defaults.cdn_base),
            placeholder_path: env::var("PLACEHOLDER_PATH").unwrap_or(defaults.placeholder_path),
            max_concurrent_loads: parse_var("MAX_CONCURRENT_LOADS")
                .unwrap_or(defaults.max_concurrent_loads),
            load_delay_ms: parse_var("LOAD_DELAY_MS").unwrap_or(defaults.load_delay_ms),
            preload_timeout_ms: parse_var("PRELOAD_TIMEOUT_MS")
                .unwrap_or(defaults.preload_timeout_ms),
            suppression_window: parse_var("SUPPRESSION_WINDOW")
                .unwrap_or(defaults.suppression_window),
            storage_dir: env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            sync_url: env::var("SYNC_URL").ok().filter(|url| !url.is_empty()),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Cache TTL in milliseconds, the unit cache timestamps are stored in.
    pub fn cache_ttl_ms(&self) -> i64 {
        i64::try_from(self.cache_ttl.saturating_mul(1000)).unwrap_or(i64::MAX)
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }

    pub fn preload_timeout(&self) -> Duration {
        Duration::from_millis(self.preload_timeout_ms)
    }

    pub fn suppression(&self) -> Duration {
        Duration::from_secs(self.suppression_window)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            cache_ttl: 24 * 60 * 60,
            server_port: 3000,
            cdn_base: DEFAULT_CDN_BASE.to_string(),
            placeholder_path: DEFAULT_PLACEHOLDER_PATH.to_string(),
            max_concurrent_loads: 3,
            load_delay_ms: 50,
            preload_timeout_ms: 10_000,
            suppression_window: 30,
            storage_dir: PathBuf::from(".media_cache"),
            sync_url: None,
            cleanup_interval: 60,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.cache_ttl, 86_400);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.max_concurrent_loads, 3);
        assert_eq!(config.suppression_window, 30);
        assert!(config.sync_url.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Only clears variables no other test sets
        env::remove_var("MAX_ENTRIES");
        env::remove_var("CACHE_TTL");
        env::remove_var("SYNC_URL");

        let config = Config::from_env();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.cache_ttl, 86_400);
        assert!(config.sync_url.is_none());
    }

    #[test]
    fn test_derived_durations() {
        let config = Config::default();
        assert_eq!(config.cache_ttl_ms(), 86_400_000);
        assert_eq!(config.load_delay(), Duration::from_millis(50));
        assert_eq!(config.suppression(), Duration::from_secs(30));
    }
}
