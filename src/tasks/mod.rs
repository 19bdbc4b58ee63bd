//! Background Tasks Module
//!
//! Contains background tasks that run during server operation.
//!
//! # Tasks
//! - Cleanup: Sweeps expired suppression entries at configured intervals
//! - Replay: Drains the offline queue when connectivity returns

mod cleanup;
mod replay;

pub use cleanup::spawn_cleanup_task;
pub use replay::{spawn_replay_task, HttpSyncRemote, SyncRemote};
