//! Lazy Loading Module
//!
//! Defers applying image attributes until a target nears the viewport,
//! with bounded concurrency and clean teardown.

mod scheduler;
mod target;

pub use scheduler::{LazyLoadScheduler, SchedulerConfig, SETTLED_HISTORY};
pub use target::{
    LazyTarget, LoadOutcome, PendingAttributes, Priority, TargetId, TargetState, VisibilityReport,
};
