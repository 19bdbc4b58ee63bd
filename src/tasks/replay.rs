//! Offline Replay Task
//!
//! Watches connectivity and drains the offline operation queue against a
//! remote whenever the service comes back online.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{MediaError, Result};
use crate::offline::{CollectionStore, OfflineOperation};

// == Sync Remote ==
/// Destination queued operations are replayed against.
#[async_trait]
pub trait SyncRemote: Send + Sync {
    async fn apply(&self, op: &OfflineOperation) -> Result<()>;
}

/// Remote that POSTs each operation as JSON to `{base}/operations`.
#[derive(Debug, Clone)]
pub struct HttpSyncRemote {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSyncRemote {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/operations", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SyncRemote for HttpSyncRemote {
    async fn apply(&self, op: &OfflineOperation) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(op)
            .send()
            .await
            .map_err(|e| MediaError::Sync(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| MediaError::Sync(e.to_string()))?;
        Ok(())
    }
}

/// Spawns the replay task.
///
/// The queue is drained once at startup when already online, then again on
/// every offline → online transition seen on `connectivity`. The task ends
/// when the sender is dropped.
///
/// # Arguments
/// * `collections` - Store owning the offline queue
/// * `connectivity` - `true` while online
/// * `remote` - Where operations are replayed
pub fn spawn_replay_task(
    collections: Arc<CollectionStore>,
    mut connectivity: watch::Receiver<bool>,
    remote: Arc<dyn SyncRemote>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut online = *connectivity.borrow_and_update();
        info!(online, "Starting offline replay task");

        if online {
            replay(&collections, &remote).await;
        }

        while connectivity.changed().await.is_ok() {
            let now_online = *connectivity.borrow_and_update();
            if now_online && !online {
                replay(&collections, &remote).await;
            }
            online = now_online;
        }

        debug!("Connectivity channel closed, replay task stopping");
    })
}

async fn replay(collections: &CollectionStore, remote: &Arc<dyn SyncRemote>) {
    if collections.queue().is_empty() {
        return;
    }

    let result = collections
        .replay(|op| {
            let remote = remote.clone();
            async move { remote.apply(&op).await }
        })
        .await;

    match result {
        Ok(outcome) if outcome.halted => {
            debug!(remaining = outcome.remaining, "Replay halted, waiting for next reconnect");
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Offline replay could not update the queue"),
    }
}
