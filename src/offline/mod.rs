//! Offline Module
//!
//! Durable storage, the offline operation log, and the collections store
//! that writes through it.

pub mod collections;
pub mod queue;
pub mod store;

pub use collections::{CollectionItem, CollectionStore, MutationOutcome, DEFAULT_SUPPRESSION_WINDOW};
pub use queue::{DrainOutcome, OfflineOperation, OfflineQueue, OperationKind};
pub use store::{FileStore, KeyValueStore, MemoryStore, COLLECTIONS_KEY, OFFLINE_QUEUE_KEY};
