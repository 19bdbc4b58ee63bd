//! Cache Entry Module
//!
//! Defines a single memoised URL together with the time it was written.

use serde::Serialize;

// == Cache Entry ==
/// A resolved URL and the moment it was computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Composite key (`path|size`)
    pub key: String,
    /// The fully qualified URL
    pub url: String,
    /// Write timestamp (Unix milliseconds)
    pub timestamp: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(key: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_timestamp(key, url, current_timestamp_ms())
    }

    /// Creates an entry with an explicit write time.
    pub fn with_timestamp(key: impl Into<String>, url: impl Into<String>, timestamp: i64) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
            timestamp,
        }
    }

    // == Is Stale ==
    /// Checks whether the entry is older than `ttl_ms` at time `now`.
    ///
    /// An entry exactly `ttl_ms` old is still fresh; staleness starts one
    /// millisecond later.
    pub fn is_stale_at(&self, now: i64, ttl_ms: i64) -> bool {
        now.saturating_sub(self.timestamp) > ttl_ms
    }

    /// Same as [`is_stale_at`](Self::is_stale_at) against the wall clock.
    pub fn is_stale(&self, ttl_ms: i64) -> bool {
        self.is_stale_at(current_timestamp_ms(), ttl_ms)
    }

    /// Milliseconds since the entry was written.
    pub fn age_ms(&self) -> i64 {
        current_timestamp_ms().saturating_sub(self.timestamp).max(0)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    #[test]
    fn test_entry_creation() {
        let before = current_timestamp_ms();
        let entry = CacheEntry::new("/a.jpg|w342", "https://cdn/w342/a.jpg");

        assert_eq!(entry.key, "/a.jpg|w342");
        assert_eq!(entry.url, "https://cdn/w342/a.jpg");
        assert!(entry.timestamp >= before);
        assert!(!entry.is_stale(DAY_MS));
    }

    #[test]
    fn test_staleness_boundary() {
        let entry = CacheEntry::with_timestamp("k", "u", 1_000);

        assert!(!entry.is_stale_at(1_000 + DAY_MS, DAY_MS));
        assert!(entry.is_stale_at(1_000 + DAY_MS + 1, DAY_MS));
    }

    #[test]
    fn test_old_entry_is_stale() {
        let entry = CacheEntry::with_timestamp("k", "u", current_timestamp_ms() - DAY_MS - 5);
        assert!(entry.is_stale(DAY_MS));
        assert!(entry.age_ms() > DAY_MS);
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let entry = CacheEntry::with_timestamp("k", "u", current_timestamp_ms() + 60_000);
        assert!(!entry.is_stale(DAY_MS));
        assert_eq!(entry.age_ms(), 0);
    }
}
