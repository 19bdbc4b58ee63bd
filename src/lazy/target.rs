//! Types describing a lazily loaded target and what the scheduler knows about it.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Handle the scheduler hands out for each observed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target-{}", self.0)
    }
}

/// Attributes held back until the target is close enough to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttributes {
    pub src: String,
    pub src_set: Option<String>,
}

impl PendingAttributes {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            src_set: None,
        }
    }

    pub fn with_src_set(mut self, src_set: impl Into<String>) -> Self {
        let src_set = src_set.into();
        self.src_set = (!src_set.is_empty()).then_some(src_set);
        self
    }
}

/// How eagerly a target should be loaded ahead of becoming visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// Distance in pixels outside the viewport at which loading starts.
    pub fn root_margin(&self) -> f64 {
        match self {
            Priority::Low => 25.0,
            Priority::Normal => 50.0,
            Priority::High => 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOutcome {
    Loaded,
    Errored,
}

/// Lifecycle of an observed target. Targets that were never observed (or
/// were unobserved) have no state at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    Observed,
    Queued,
    Loading,
    Settled(LoadOutcome),
}

/// One visibility sample for an observed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityReport {
    pub id: TargetId,
    /// Gap between the target and the viewport edge; zero or negative once
    /// the two intersect
    pub distance_px: f64,
    /// Fraction of the target inside the viewport, 0.0 to 1.0
    pub visible_ratio: f64,
}

impl VisibilityReport {
    pub fn new(id: TargetId, distance_px: f64, visible_ratio: f64) -> Self {
        Self {
            id,
            distance_px,
            visible_ratio,
        }
    }
}

/// Anything that can receive its deferred attributes once admitted.
///
/// In a browser this is an `<img>` element; elsewhere it can be any
/// resource handle with an "activate" step.
#[async_trait]
pub trait LazyTarget: Send + Sync {
    /// Applies the deferred attributes. An error marks the target as
    /// [`LoadOutcome::Errored`].
    async fn activate(&self, attributes: &PendingAttributes) -> Result<()>;
}
