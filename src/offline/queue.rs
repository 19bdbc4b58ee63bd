//! Offline Operation Queue
//!
//! A persisted FIFO of mutations made while offline. Operations are removed
//! one at a time, only after the remote side accepted them, so replay is
//! at-least-once and never reorders.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::current_timestamp_ms;
use crate::error::Result;

use super::store::{load_json, save_json, KeyValueStore, OFFLINE_QUEUE_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Remove,
    Clear,
}

// == Offline Operation ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineOperation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub payload: Value,
    /// Creation time (Unix milliseconds)
    pub timestamp: i64,
    pub id: String,
}

impl OfflineOperation {
    pub fn new(kind: OperationKind, payload: Value) -> Self {
        Self {
            kind,
            payload,
            timestamp: current_timestamp_ms(),
            id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn add(item: Value) -> Self {
        Self::new(OperationKind::Add, item)
    }

    pub fn remove(item_id: &str) -> Self {
        Self::new(OperationKind::Remove, serde_json::json!({ "id": item_id }))
    }

    pub fn clear() -> Self {
        Self::new(OperationKind::Clear, Value::Null)
    }
}

/// Result of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DrainOutcome {
    /// Operations accepted and removed from the queue
    pub applied: usize,
    /// Operations still queued afterwards
    pub remaining: usize,
    /// Whether the pass stopped on a failed operation
    pub halted: bool,
}

// == Offline Queue ==
pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    ops: Mutex<VecDeque<OfflineOperation>>,
    // Held for the duration of a drain so passes never interleave
    drain_lock: tokio::sync::Mutex<()>,
}

impl OfflineQueue {
    /// Opens the queue, restoring whatever was persisted.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let ops: VecDeque<OfflineOperation> =
            load_json(store.as_ref(), OFFLINE_QUEUE_KEY)?.unwrap_or_default();
        if !ops.is_empty() {
            info!(pending = ops.len(), "Restored offline operation queue");
        }
        Ok(Self {
            store,
            ops: Mutex::new(ops),
            drain_lock: tokio::sync::Mutex::new(()),
        })
    }

    // == Enqueue ==
    /// Appends `op` and persists the queue before returning.
    ///
    /// If persisting fails the operation is not kept in memory either.
    pub fn enqueue(&self, op: OfflineOperation) -> Result<()> {
        let mut ops = self.ops.lock();
        debug!(id = %op.id, kind = ?op.kind, "Enqueued offline operation");
        ops.push_back(op);
        if let Err(e) = self.persist(&ops) {
            ops.pop_back();
            return Err(e);
        }
        Ok(())
    }

    // == Retract ==
    /// Removes the most recent operation if its id is `id`.
    ///
    /// Undoes an `enqueue` whose follow-up work failed. Returns whether an
    /// operation was removed.
    pub fn retract(&self, id: &str) -> Result<bool> {
        let mut ops = self.ops.lock();
        if !ops.back().is_some_and(|op| op.id == id) {
            return Ok(false);
        }
        let Some(op) = ops.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&ops) {
            ops.push_back(op);
            return Err(e);
        }
        debug!(id = %id, "Retracted offline operation");
        Ok(true)
    }

    // == Drain ==
    /// Replays queued operations in order through `apply`.
    ///
    /// Each operation leaves the queue only after `apply` succeeds. The
    /// first failure stops the pass and leaves that operation at the head
    /// for the next attempt. Errors are only returned for storage failures.
    pub async fn drain<F, Fut>(&self, mut apply: F) -> Result<DrainOutcome>
    where
        F: FnMut(OfflineOperation) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let _pass = self.drain_lock.lock().await;
        let mut outcome = DrainOutcome::default();

        loop {
            let Some(op) = self.ops.lock().front().cloned() else {
                break;
            };

            if let Err(e) = apply(op.clone()).await {
                warn!(id = %op.id, kind = ?op.kind, error = %e, "Offline replay failed, will retry");
                outcome.halted = true;
                break;
            }

            let mut ops = self.ops.lock();
            // A concurrent clear() may already have dropped it
            if ops.front().is_some_and(|head| head.id == op.id) {
                ops.pop_front();
                self.persist(&ops)?;
            }
            outcome.applied += 1;
        }

        outcome.remaining = self.len();
        if outcome.applied > 0 || outcome.halted {
            info!(
                applied = outcome.applied,
                remaining = outcome.remaining,
                halted = outcome.halted,
                "Offline queue drain finished"
            );
        }
        Ok(outcome)
    }

    // == Clear ==
    /// Drops every pending operation.
    pub fn clear(&self) -> Result<()> {
        let mut ops = self.ops.lock();
        let dropped = ops.len();
        ops.clear();
        self.persist(&ops)?;
        debug!(dropped, "Cleared offline queue");
        Ok(())
    }

    /// Snapshot of pending operations, oldest first.
    pub fn pending(&self) -> Vec<OfflineOperation> {
        self.ops.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ops.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().is_empty()
    }

    fn persist(&self, ops: &VecDeque<OfflineOperation>) -> Result<()> {
        save_json(self.store.as_ref(), OFFLINE_QUEUE_KEY, ops)
    }
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("pending", &self.len())
            .finish_non_exhaustive()
    }
}
