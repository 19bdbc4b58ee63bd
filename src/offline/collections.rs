//! Collections store
//!
//! The user's saved items, persisted locally. While offline every mutation
//! is first written to the [`OfflineQueue`] and then applied to local state,
//! so local state is always the cumulative effect of the log.
//!
//! Opposite mutations on the same id inside the suppression window are
//! dropped: a `remove` right after an `add` (or the reverse) is treated as a
//! duplicate or stale event.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::current_timestamp_ms;
use crate::error::{MediaError, Result};

use super::queue::{DrainOutcome, OfflineOperation, OfflineQueue};
use super::store::{load_json, save_json, KeyValueStore, COLLECTIONS_KEY};

/// Default anti-flicker window.
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_secs(30);

// == Collection Item ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub id: String,
    #[serde(default)]
    pub added_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    /// Arbitrary content fields (title, poster path, media type, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CollectionItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            added_at: 0,
            updated_at: 0,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// What a mutation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOutcome {
    /// Applied to local state while online
    Applied,
    /// Applied to local state and queued for replay
    Queued,
    /// Dropped: the opposite mutation on this id happened too recently
    Suppressed,
    /// Nothing to do (removing an id that is not present)
    Unchanged,
}

#[derive(Debug, Default)]
struct State {
    items: Vec<CollectionItem>,
    /// id -> expiry of the suppression entry
    recently_added: HashMap<String, Instant>,
    recently_removed: HashMap<String, Instant>,
}

impl State {
    /// Drops expired suppression entries, returning how many went.
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.recently_added.len() + self.recently_removed.len();
        self.recently_added.retain(|_, expiry| *expiry > now);
        self.recently_removed.retain(|_, expiry| *expiry > now);
        before - (self.recently_added.len() + self.recently_removed.len())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

// == Collection Store ==
pub struct CollectionStore {
    store: Arc<dyn KeyValueStore>,
    queue: Arc<OfflineQueue>,
    state: Mutex<State>,
    online: AtomicBool,
    window: Duration,
}

impl CollectionStore {
    /// Opens the store, restoring persisted items. Starts online.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        queue: Arc<OfflineQueue>,
        window: Duration,
    ) -> Result<Self> {
        let items: Vec<CollectionItem> =
            load_json(store.as_ref(), COLLECTIONS_KEY)?.unwrap_or_default();
        debug!(items = items.len(), "Loaded collections");

        Ok(Self {
            store,
            queue,
            state: Mutex::new(State {
                items,
                ..State::default()
            }),
            online: AtomicBool::new(true),
            window,
        })
    }

    // == Add ==
    /// Adds `item`, or refreshes it when the id is already present.
    pub fn add(&self, mut item: CollectionItem) -> Result<MutationOutcome> {
        if item.id.trim().is_empty() {
            return Err(MediaError::InvalidRequest("Item id cannot be empty".to_string()));
        }

        let now = Instant::now();
        let mut state = self.state.lock();
        state.sweep(now);

        if state.recently_removed.contains_key(&item.id) {
            debug!(id = %item.id, "Add suppressed, item was just removed");
            return Ok(MutationOutcome::Suppressed);
        }

        let stamp = current_timestamp_ms();
        let existing = state.position(&item.id);
        item.added_at = match existing {
            Some(index) => state.items[index].added_at,
            None => stamp,
        };
        item.updated_at = stamp;

        let op = OfflineOperation::add(serde_json::to_value(&item)?);
        let id = item.id.clone();
        let mut items = state.items.clone();
        match existing {
            Some(index) => items[index] = item,
            None => items.push(item),
        }

        let outcome = self.commit(&mut state, items, op)?;
        state.recently_added.insert(id, now + self.window);
        Ok(outcome)
    }

    // == Remove ==
    pub fn remove(&self, id: &str) -> Result<MutationOutcome> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.sweep(now);

        if state.recently_added.contains_key(id) {
            debug!(id = %id, "Remove suppressed, item was just added");
            return Ok(MutationOutcome::Suppressed);
        }
        let Some(index) = state.position(id) else {
            return Ok(MutationOutcome::Unchanged);
        };

        let mut items = state.items.clone();
        items.remove(index);

        let outcome = self.commit(&mut state, items, OfflineOperation::remove(id))?;
        state.recently_removed.insert(id.to_string(), now + self.window);
        Ok(outcome)
    }

    // == Clear ==
    pub fn clear(&self) -> Result<MutationOutcome> {
        let mut state = self.state.lock();
        let dropped = state.items.len();

        let outcome = self.commit(&mut state, Vec::new(), OfflineOperation::clear())?;
        info!(dropped, "Cleared collections");
        Ok(outcome)
    }

    // == Queries ==
    pub fn items(&self) -> Vec<CollectionItem> {
        self.state.lock().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<CollectionItem> {
        let state = self.state.lock();
        state.position(id).map(|index| state.items[index].clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Connectivity ==
    /// Records connectivity, returning the previous value.
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::AcqRel);
        if previous != online {
            info!(online, pending = self.queue.len(), "Connectivity changed");
        }
        previous
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    // == Replay ==
    /// Replays queued mutations through `apply` in order.
    pub async fn replay<F, Fut>(&self, apply: F) -> Result<DrainOutcome>
    where
        F: FnMut(OfflineOperation) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        self.queue.drain(apply).await
    }

    /// Drops expired suppression entries now rather than on next access.
    pub fn sweep_suppressions(&self) -> usize {
        self.state.lock().sweep(Instant::now())
    }

    /// Makes `items` the current collection.
    ///
    /// When offline `op` is queued first. Items are persisted before they
    /// replace local state, and a failed persist retracts the queued
    /// operation, so on error neither the queue nor local state changed.
    fn commit(
        &self,
        state: &mut State,
        items: Vec<CollectionItem>,
        op: OfflineOperation,
    ) -> Result<MutationOutcome> {
        let queued = if self.is_online() {
            None
        } else {
            let id = op.id.clone();
            self.queue.enqueue(op)?;
            Some(id)
        };

        if let Err(e) = self.persist(&items) {
            if let Some(id) = &queued {
                if let Err(undo) = self.queue.retract(id) {
                    warn!(id = %id, error = %undo, "Could not retract queued operation");
                }
            }
            return Err(e);
        }

        state.items = items;
        Ok(match queued {
            Some(_) => MutationOutcome::Queued,
            None => MutationOutcome::Applied,
        })
    }

    fn persist(&self, items: &[CollectionItem]) -> Result<()> {
        save_json(self.store.as_ref(), COLLECTIONS_KEY, items)
    }
}

impl std::fmt::Debug for CollectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStore")
            .field("items", &self.len())
            .field("online", &self.is_online())
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::queue::OperationKind;
    use crate::offline::store::MemoryStore;

    fn open_store() -> (Arc<MemoryStore>, CollectionStore) {
        let kv = Arc::new(MemoryStore::new());
        let queue = Arc::new(OfflineQueue::open(kv.clone()).unwrap());
        let store = CollectionStore::open(kv.clone(), queue, DEFAULT_SUPPRESSION_WINDOW).unwrap();
        (kv, store)
    }

    fn movie(id: &str) -> CollectionItem {
        CollectionItem::new(id)
            .with_field("title", "Heat")
            .with_field("posterPath", "/heat.jpg")
    }

    /// Memory store whose collection writes can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_collections: std::sync::atomic::AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == COLLECTIONS_KEY && self.fail_collections.load(Ordering::SeqCst) {
                return Err(MediaError::Storage("disk full".into()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    fn open_flaky() -> (Arc<FlakyStore>, CollectionStore) {
        let kv = Arc::new(FlakyStore::default());
        let queue = Arc::new(OfflineQueue::open(kv.clone()).unwrap());
        let store = CollectionStore::open(kv.clone(), queue, DEFAULT_SUPPRESSION_WINDOW).unwrap();
        (kv, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_persist_changes_nothing_offline() {
        let (kv, store) = open_flaky();
        store.set_online(false);
        kv.fail_collections.store(true, Ordering::SeqCst);

        for _ in 0..2 {
            assert!(matches!(store.add(movie("1")), Err(MediaError::Storage(_))));
            assert!(!store.contains("1"));
            assert!(store.queue().is_empty());
        }

        kv.fail_collections.store(false, Ordering::SeqCst);
        assert_eq!(store.add(movie("1")).unwrap(), MutationOutcome::Queued);
        assert_eq!(store.queue().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_persist_keeps_items_and_suppression() {
        let (kv, store) = open_flaky();
        store.add(movie("1")).unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;

        store.set_online(false);
        kv.fail_collections.store(true, Ordering::SeqCst);
        assert!(store.remove("1").is_err());
        assert!(store.clear().is_err());
        assert!(store.contains("1"));
        assert!(store.queue().is_empty());

        // The failed remove left no suppression entry behind
        kv.fail_collections.store(false, Ordering::SeqCst);
        assert_eq!(store.add(movie("1")).unwrap(), MutationOutcome::Queued);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_is_unique_by_id() {
        let (_kv, store) = open_store();

        assert_eq!(store.add(movie("1")).unwrap(), MutationOutcome::Applied);
        let first = store.get("1").unwrap();
        assert!(first.added_at > 0);

        let renamed = CollectionItem::new("1").with_field("title", "Heat (1995)");
        store.add(renamed).unwrap();

        assert_eq!(store.len(), 1);
        let item = store.get("1").unwrap();
        assert_eq!(item.fields["title"], "Heat (1995)");
        assert_eq!(item.added_at, first.added_at);
        assert!(item.updated_at >= first.updated_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_right_after_add_is_suppressed() {
        let (_kv, store) = open_store();
        store.add(movie("1")).unwrap();

        assert_eq!(store.remove("1").unwrap(), MutationOutcome::Suppressed);
        assert!(store.contains("1"));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(store.remove("1").unwrap(), MutationOutcome::Applied);
        assert!(!store.contains("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_right_after_remove_is_suppressed() {
        let (_kv, store) = open_store();
        store.add(movie("1")).unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        store.remove("1").unwrap();

        assert_eq!(store.add(movie("1")).unwrap(), MutationOutcome::Suppressed);
        assert!(!store.contains("1"));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(store.add(movie("1")).unwrap(), MutationOutcome::Suppressed);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.add(movie("1")).unwrap(), MutationOutcome::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_missing_is_unchanged() {
        let (_kv, store) = open_store();
        assert_eq!(store.remove("nope").unwrap(), MutationOutcome::Unchanged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_id_rejected() {
        let (_kv, store) = open_store();
        assert!(matches!(
            store.add(CollectionItem::new(" ")),
            Err(MediaError::InvalidRequest(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_mutations_are_queued_in_order() {
        let (kv, store) = open_store();
        store.set_online(false);

        assert_eq!(store.add(movie("1")).unwrap(), MutationOutcome::Queued);
        assert_eq!(store.add(movie("2")).unwrap(), MutationOutcome::Queued);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(store.remove("1").unwrap(), MutationOutcome::Queued);

        let kinds: Vec<OperationKind> = store.queue().pending().iter().map(|op| op.kind).collect();
        assert_eq!(kinds, vec![OperationKind::Add, OperationKind::Add, OperationKind::Remove]);
        assert_eq!(store.items().len(), 1);

        // Local state survives a reload
        let queue = Arc::new(OfflineQueue::open(kv.clone()).unwrap());
        let reloaded = CollectionStore::open(kv, queue, DEFAULT_SUPPRESSION_WINDOW).unwrap();
        assert!(reloaded.contains("2"));
        assert!(!reloaded.contains("1"));
        assert_eq!(reloaded.queue().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_after_reconnect() {
        let (_kv, store) = open_store();
        store.set_online(false);
        store.add(movie("1")).unwrap();
        store.clear().unwrap();

        assert!(!store.set_online(true));
        let replayed = Arc::new(Mutex::new(Vec::new()));
        let sink = replayed.clone();
        let outcome = store
            .replay(move |op| {
                let sink = sink.clone();
                async move {
                    sink.lock().push(op.kind);
                    Ok::<(), MediaError>(())
                }
            })
            .await
            .unwrap();

        assert_eq!(outcome.applied, 2);
        assert_eq!(*replayed.lock(), vec![OperationKind::Add, OperationKind::Clear]);
        assert!(store.queue().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_expired_entries() {
        let (_kv, store) = open_store();
        store.add(movie("1")).unwrap();
        store.add(movie("2")).unwrap();

        assert_eq!(store.sweep_suppressions(), 0);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(store.sweep_suppressions(), 2);
    }

    #[test]
    fn test_item_wire_format() {
        let json = r#"{"id":"550","addedAt":1,"updatedAt":2,"title":"Fight Club","mediaType":"movie"}"#;
        let item: CollectionItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.id, "550");
        assert_eq!(item.added_at, 1);
        assert_eq!(item.fields["mediaType"], "movie");

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["updatedAt"], 2);
        assert_eq!(back["title"], "Fight Club");
    }
}
