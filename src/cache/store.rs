//! Resource Cache Module
//!
//! Bounded key -> URL map. Entries are evicted oldest-timestamp-first in
//! batches once capacity is exceeded. Staleness is left to the caller.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EVICTION_FRACTION};

// == Resource Cache ==
/// Capacity-bounded store of resolved URLs.
#[derive(Debug)]
pub struct ResourceCache {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
}

impl ResourceCache {
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one so the entry just written always
    /// survives its own insert.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            capacity: capacity.max(1),
        }
    }

    // == Get ==
    /// Returns the entry stored under `key`, fresh or not.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Set ==
    /// Stores `entry` under `key`, overwriting any previous entry.
    ///
    /// When the insert pushes the size over capacity, the oldest fifth of
    /// the entries (at least one) is evicted by timestamp. The key just
    /// written is never a candidate.
    pub fn set(&mut self, key: impl Into<String>, mut entry: CacheEntry) {
        let key = key.into();
        entry.key = key.clone();
        self.entries.insert(key.clone(), entry);

        if self.entries.len() > self.capacity {
            let evicted = self.evict_oldest(&key);
            self.stats.record_evictions(evicted);
            debug!(
                evicted,
                size = self.entries.len(),
                capacity = self.capacity,
                "Resource cache over capacity, evicted oldest entries"
            );
        }
    }

    // == Clear ==
    /// Removes every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Stats ==
    /// Returns current occupancy and counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.size = self.entries.len();
        stats.keys = self.entries.keys().cloned().collect();
        stats
    }

    // == Counters ==
    /// Counts a lookup answered from a fresh entry.
    pub fn record_hit(&mut self) {
        self.stats.record_hit();
    }

    /// Counts a lookup that had to recompute.
    pub fn record_miss(&mut self) {
        self.stats.record_miss();
    }

    // == Size ==
    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts the oldest batch, sparing `keep`. Returns how many went.
    fn evict_oldest(&mut self, keep: &str) -> usize {
        let batch = ((self.capacity as f64 * EVICTION_FRACTION).floor() as usize).max(1);

        let mut candidates: Vec<(i64, String)> = self
            .entries
            .iter()
            .filter(|(key, _)| key.as_str() != keep)
            .map(|(key, entry)| (entry.timestamp, key.clone()))
            .collect();
        // Key breaks timestamp ties so eviction is deterministic
        candidates.sort_unstable();

        let mut removed = 0;
        for (_, key) in candidates.into_iter().take(batch) {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        removed
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(crate::cache::DEFAULT_CAPACITY)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(ts: i64) -> CacheEntry {
        CacheEntry::with_timestamp("", format!("https://cdn/{ts}"), ts)
    }

    #[test]
    fn test_cache_new() {
        let cache = ResourceCache::new(100);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 100);
        assert_eq!(ResourceCache::default().capacity(), 1000);
    }

    #[test]
    fn test_set_and_get() {
        let mut cache = ResourceCache::new(10);
        cache.set("/a.jpg|w342", CacheEntry::new("ignored", "https://cdn/w342/a.jpg"));

        let entry = cache.get("/a.jpg|w342").unwrap();
        assert_eq!(entry.url, "https://cdn/w342/a.jpg");
        assert_eq!(entry.key, "/a.jpg|w342");
        assert!(cache.get("/b.jpg|w342").is_none());
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let mut cache = ResourceCache::new(10);
        cache.set("k", entry_at(1));
        cache.set("k", entry_at(2));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k").unwrap().timestamp, 2);
    }

    #[test]
    fn test_eviction_removes_oldest_fifth() {
        let mut cache = ResourceCache::new(10);
        for ts in 0..10 {
            cache.set(format!("k{ts}"), entry_at(100 + ts));
        }
        assert_eq!(cache.len(), 10);

        cache.set("k10", entry_at(500));

        // 11 entries -> evict floor(10 * 0.2) = 2 oldest
        assert_eq!(cache.len(), 9);
        assert!(cache.get("k0").is_none());
        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k10").is_some());
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_eviction_spares_new_entry_even_if_oldest() {
        let mut cache = ResourceCache::new(5);
        for ts in 0..5 {
            cache.set(format!("k{ts}"), entry_at(1_000 + ts));
        }

        cache.set("ancient", entry_at(1));

        assert!(cache.len() <= 5);
        assert!(cache.get("ancient").is_some());
        assert!(cache.get("k0").is_none());
    }

    #[test]
    fn test_small_capacity_still_bounded() {
        let mut cache = ResourceCache::new(2);
        cache.set("a", entry_at(1));
        cache.set("b", entry_at(2));
        cache.set("c", entry_at(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut cache = ResourceCache::new(0);
        cache.set("a", entry_at(1));
        cache.set("b", entry_at(2));

        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_clear() {
        let mut cache = ResourceCache::new(10);
        cache.set("a", entry_at(1));
        cache.record_hit();
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_stats_lists_keys() {
        let mut cache = ResourceCache::new(10);
        cache.set("a", entry_at(1));
        cache.set("b", entry_at(2));
        cache.record_miss();

        let stats = cache.stats();
        let mut keys = stats.keys.clone();
        keys.sort();
        assert_eq!(stats.size, 2);
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(stats.misses, 1);
    }
}
