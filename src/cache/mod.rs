//! Cache Module
//!
//! Provides the bounded in-memory map of resolved image URLs.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use stats::CacheStats;
pub use store::ResourceCache;

// == Public Constants ==
/// Default number of entries before eviction kicks in
pub const DEFAULT_CAPACITY: usize = 1000;

/// Share of the capacity evicted in one pass once the cache overflows
pub const EVICTION_FRACTION: f64 = 0.2;

/// Default staleness threshold (24 hours) in milliseconds
pub const DEFAULT_TTL_MS: i64 = 24 * 60 * 60 * 1000;
