//! URL Builder
//!
//! Maps an image path and size to a CDN URL, memoised through the shared
//! [`ResourceCache`](crate::cache::ResourceCache).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::cache::{current_timestamp_ms, CacheEntry, ResourceCache};
use crate::config::Config;

use super::network::{preferred_size, NetworkClass};
use super::size::SizeToken;

/// The resource cache as shared between builders and background tasks.
pub type SharedCache = Arc<Mutex<ResourceCache>>;

// == URL Builder ==
/// Resolves image paths into fully qualified CDN URLs.
pub struct UrlBuilder {
    cdn_base: String,
    placeholder: String,
    ttl_ms: i64,
    cache: SharedCache,
    network: RwLock<NetworkClass>,
    compositions: AtomicU64,
}

impl UrlBuilder {
    // == Constructor ==
    /// Creates a builder over an existing cache.
    ///
    /// # Arguments
    /// * `cdn_base` - Base URL, a trailing `/` is dropped
    /// * `placeholder` - Path returned when no image path is given
    /// * `ttl_ms` - Age after which a cached URL is recomputed
    /// * `cache` - Shared resource cache
    pub fn new(
        cdn_base: impl Into<String>,
        placeholder: impl Into<String>,
        ttl_ms: i64,
        cache: SharedCache,
    ) -> Self {
        let cdn_base = cdn_base.into().trim_end_matches('/').to_string();
        Self {
            cdn_base,
            placeholder: placeholder.into(),
            ttl_ms,
            cache,
            network: RwLock::new(NetworkClass::Unknown),
            compositions: AtomicU64::new(0),
        }
    }

    /// Creates a builder from configuration.
    pub fn from_config(config: &Config, cache: SharedCache) -> Self {
        Self::new(
            config.cdn_base.clone(),
            config.placeholder_path.clone(),
            config.cache_ttl_ms(),
            cache,
        )
    }

    // == Resolve ==
    /// Returns the URL for `path` at `size`.
    ///
    /// A missing or blank path yields `fallback`, or the placeholder when no
    /// fallback is given. Otherwise the URL comes from the cache when a
    /// fresh entry exists and is composed (and cached) when it does not.
    pub fn resolve(&self, path: Option<&str>, size: &SizeToken, fallback: Option<&str>) -> String {
        let Some(path) = path.filter(|p| !p.trim().is_empty()) else {
            return self.fallback(fallback);
        };

        let key = cache_key(path, size);
        let now = current_timestamp_ms();

        {
            let mut cache = self.cache.lock();
            let cached = cache
                .get(&key)
                .filter(|entry| !entry.is_stale_at(now, self.ttl_ms))
                .map(|entry| entry.url.clone());
            match cached {
                Some(url) => {
                    cache.record_hit();
                    trace!(key = %key, "Resource cache hit");
                    return url;
                }
                None => cache.record_miss(),
            }
        }

        let url = self.compose(path, size);
        self.cache
            .lock()
            .set(key.clone(), CacheEntry::with_timestamp(key.as_str(), url.as_str(), now));
        trace!(key = %key, url = %url, "Resource cache miss, composed URL");
        url
    }

    /// Resolves at the size preferred for the current network class.
    pub fn resolve_auto(&self, path: Option<&str>, fallback: Option<&str>) -> String {
        let size = preferred_size(self.network_class());
        self.resolve(path, &size, fallback)
    }

    // == Network Class ==
    pub fn set_network_class(&self, class: NetworkClass) {
        *self.network.write() = class;
    }

    pub fn network_class(&self) -> NetworkClass {
        *self.network.read()
    }

    // == Accessors ==
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Number of URLs composed so far (cache misses that reached composition).
    pub fn compose_count(&self) -> u64 {
        self.compositions.load(Ordering::Relaxed)
    }

    fn fallback(&self, fallback: Option<&str>) -> String {
        fallback
            .filter(|f| !f.is_empty())
            .unwrap_or(self.placeholder.as_str())
            .to_string()
    }

    fn compose(&self, path: &str, size: &SizeToken) -> String {
        self.compositions.fetch_add(1, Ordering::Relaxed);
        if path.starts_with('/') {
            format!("{}/{}{}", self.cdn_base, size, path)
        } else {
            format!("{}/{}/{}", self.cdn_base, size, path)
        }
    }
}

impl fmt::Debug for UrlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlBuilder")
            .field("cdn_base", &self.cdn_base)
            .field("placeholder", &self.placeholder)
            .field("ttl_ms", &self.ttl_ms)
            .finish_non_exhaustive()
    }
}

/// Cache key for a path at a size.
pub fn cache_key(path: &str, size: &SizeToken) -> String {
    format!("{path}|{size}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_TTL_MS;

    const CDN: &str = "https://image.tmdb.org/t/p";

    fn builder() -> UrlBuilder {
        let cache = Arc::new(Mutex::new(ResourceCache::new(100)));
        UrlBuilder::new(CDN, "/placeholder.svg", DEFAULT_TTL_MS, cache)
    }

    #[test]
    fn test_missing_path_uses_fallback() {
        let b = builder();
        assert_eq!(b.resolve(None, &SizeToken::MEDIUM, Some("/ph.jpg")), "/ph.jpg");
        assert_eq!(b.resolve(Some(""), &SizeToken::MEDIUM, None), "/placeholder.svg");
        assert_eq!(b.resolve(Some("   "), &SizeToken::MEDIUM, Some("")), "/placeholder.svg");
        assert_eq!(b.compose_count(), 0);
        assert!(b.cache().lock().is_empty());
    }

    #[test]
    fn test_composes_cdn_url() {
        let b = builder();
        assert_eq!(
            b.resolve(Some("/abc.jpg"), &SizeToken::MEDIUM, None),
            "https://image.tmdb.org/t/p/w342/abc.jpg"
        );
        assert_eq!(
            b.resolve(Some("abc.jpg"), &SizeToken::SMALL, None),
            "https://image.tmdb.org/t/p/w154/abc.jpg"
        );
    }

    #[test]
    fn test_trailing_slash_on_base_is_dropped() {
        let cache = Arc::new(Mutex::new(ResourceCache::new(10)));
        let b = UrlBuilder::new("https://cdn.example/", "/p.svg", DEFAULT_TTL_MS, cache);
        assert_eq!(
            b.resolve(Some("/x.jpg"), &SizeToken::LARGE, None),
            "https://cdn.example/w500/x.jpg"
        );
    }

    #[test]
    fn test_second_resolve_hits_cache() {
        let b = builder();
        let first = b.resolve(Some("/abc.jpg"), &SizeToken::new("w342"), None);
        let second = b.resolve(Some("/abc.jpg"), &SizeToken::new("w342"), None);

        assert_eq!(first, second);
        assert_eq!(b.compose_count(), 1);

        let stats = b.cache().lock().stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.keys, vec!["/abc.jpg|w342".to_string()]);
    }

    #[test]
    fn test_stale_entry_is_recomputed() {
        let b = builder();
        let key = cache_key("/abc.jpg", &SizeToken::MEDIUM);
        let old = current_timestamp_ms() - DEFAULT_TTL_MS - 1_000;
        b.cache()
            .lock()
            .set(key.clone(), CacheEntry::with_timestamp("", "https://stale/url", old));

        let url = b.resolve(Some("/abc.jpg"), &SizeToken::MEDIUM, None);

        assert_eq!(url, "https://image.tmdb.org/t/p/w342/abc.jpg");
        assert_eq!(b.compose_count(), 1);
        assert!(b.cache().lock().get(&key).unwrap().timestamp > old);
    }

    #[test]
    fn test_sizes_are_cached_separately() {
        let b = builder();
        b.resolve(Some("/abc.jpg"), &SizeToken::SMALL, None);
        b.resolve(Some("/abc.jpg"), &SizeToken::LARGE, None);
        assert_eq!(b.compose_count(), 2);
        assert_eq!(b.cache().lock().len(), 2);
    }

    #[test]
    fn test_resolve_auto_follows_network_class() {
        let b = builder();
        assert_eq!(b.network_class(), NetworkClass::Unknown);
        assert!(b.resolve_auto(Some("/a.jpg"), None).contains("/w342/"));

        b.set_network_class(NetworkClass::Cellular2g);
        assert!(b.resolve_auto(Some("/a.jpg"), None).contains("/w154/"));
        assert_eq!(b.resolve_auto(None, Some("/ph.jpg")), "/ph.jpg");
    }
}
