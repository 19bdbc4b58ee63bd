//! Cleanup Task
//!
//! Background task that periodically sweeps expired suppression entries
//! and reports resource cache occupancy.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::images::SharedCache;
use crate::offline::CollectionStore;

/// Spawns a background task that periodically tidies shared state.
///
/// # Arguments
/// * `collections` - Store whose suppression entries are swept
/// * `cache` - Resource cache whose occupancy is logged
/// * `cleanup_interval_secs` - Interval in seconds between runs
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_cleanup_task(
    collections: Arc<CollectionStore>,
    cache: SharedCache,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Starting cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let swept = collections.sweep_suppressions();
            let (size, capacity, hit_rate) = {
                let cache = cache.lock();
                (cache.len(), cache.capacity(), cache.stats().hit_rate())
            };

            if swept > 0 {
                info!(swept, "Cleanup: dropped expired suppression entries");
            }
            debug!(size, capacity, hit_rate, "Cleanup: resource cache occupancy");
        }
    })
}
