//! Media Cache - image URL caching, lazy loading and offline sync
//!
//! Resolves CDN image URLs through a TTL-bounded cache, schedules lazy loads
//! by viewport proximity, and queues collection mutations while offline.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod images;
pub mod lazy;
pub mod models;
pub mod offline;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{MediaError, Result};
pub use tasks::{spawn_cleanup_task, spawn_replay_task};
