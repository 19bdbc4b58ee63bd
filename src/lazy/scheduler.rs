//! Lazy Load Scheduler
//!
//! Targets move `Observed -> Queued -> Loading -> Settled`. Visibility
//! reports queue targets; a background worker admits queued targets in FIFO
//! order while fewer than `max_concurrent` are loading, pauses briefly, then
//! activates them.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, trace, warn};

use crate::config::Config;

use super::target::{
    LazyTarget, LoadOutcome, PendingAttributes, Priority, TargetId, TargetState, VisibilityReport,
};

/// Tuning for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum activations in flight at once
    pub max_concurrent: usize,
    /// Pause before each activation, smoothing bursts
    pub activation_delay: Duration,
    /// Visible fraction that queues a target regardless of margin
    pub threshold: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            activation_delay: Duration::from_millis(50),
            threshold: 0.01,
        }
    }
}

impl From<&Config> for SchedulerConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrent: config.max_concurrent_loads,
            activation_delay: config.load_delay(),
            ..Self::default()
        }
    }
}

struct Managed {
    target: Option<Arc<dyn LazyTarget>>,
    pending: Option<PendingAttributes>,
    priority: Priority,
    state: TargetState,
}

/// Number of settled outcomes remembered for [`LazyLoadScheduler::state`].
pub const SETTLED_HISTORY: usize = 256;

/// State shared between the scheduler handle and its worker.
///
/// Settled targets leave `targets`; only their outcome is kept, in a
/// bounded history, so a long-lived scheduler does not grow without bound.
struct Shared {
    targets: Mutex<HashMap<TargetId, Managed>>,
    settled: Mutex<VecDeque<(TargetId, LoadOutcome)>>,
    disconnected: AtomicBool,
}

impl Shared {
    /// Moves a queued target to loading and hands out what it needs.
    fn begin_loading(&self, id: TargetId) -> Option<(Arc<dyn LazyTarget>, PendingAttributes)> {
        if self.disconnected.load(Ordering::Acquire) {
            return None;
        }
        let mut targets = self.targets.lock();
        let managed = targets.get_mut(&id)?;
        if managed.state != TargetState::Queued {
            return None;
        }
        let target = managed.target.take()?;
        let pending = managed.pending.take()?;
        managed.state = TargetState::Loading;
        Some((target, pending))
    }

    fn settle(&self, id: TargetId, outcome: LoadOutcome) {
        if self.disconnected.load(Ordering::Acquire) {
            return;
        }
        let mut targets = self.targets.lock();
        if !targets
            .get(&id)
            .is_some_and(|managed| managed.state == TargetState::Loading)
        {
            return;
        }
        targets.remove(&id);
        drop(targets);

        let mut settled = self.settled.lock();
        settled.push_back((id, outcome));
        if settled.len() > SETTLED_HISTORY {
            settled.pop_front();
        }
    }

    fn settled_outcome(&self, id: TargetId) -> Option<LoadOutcome> {
        self.settled
            .lock()
            .iter()
            .rev()
            .find(|(settled_id, _)| *settled_id == id)
            .map(|(_, outcome)| *outcome)
    }
}

// == Lazy Load Scheduler ==
pub struct LazyLoadScheduler {
    shared: Arc<Shared>,
    queue_tx: mpsc::UnboundedSender<TargetId>,
    worker: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
    threshold: f64,
}

impl LazyLoadScheduler {
    /// Creates a scheduler and starts its drain worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: SchedulerConfig) -> Self {
        let shared = Arc::new(Shared {
            targets: Mutex::new(HashMap::new()),
            settled: Mutex::new(VecDeque::new()),
            disconnected: AtomicBool::new(false),
        });
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

        let worker = tokio::spawn(run_worker(
            shared.clone(),
            queue_rx,
            semaphore,
            config.activation_delay,
        ));

        Self {
            shared,
            queue_tx,
            worker: Mutex::new(Some(worker)),
            next_id: AtomicU64::new(1),
            threshold: config.threshold,
        }
    }

    // == Observe ==
    /// Starts observing `target`, holding `pending` back until it is near.
    ///
    /// After [`disconnect`](Self::disconnect) the returned id is never tracked.
    pub fn observe(
        &self,
        target: Arc<dyn LazyTarget>,
        pending: PendingAttributes,
        priority: Priority,
    ) -> TargetId {
        let id = TargetId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if self.is_disconnected() {
            debug!(id = %id, "Scheduler disconnected, ignoring observe");
            return id;
        }

        self.shared.targets.lock().insert(
            id,
            Managed {
                target: Some(target),
                pending: Some(pending),
                priority,
                state: TargetState::Observed,
            },
        );
        trace!(id = %id, ?priority, "Observing target");
        id
    }

    /// Stops tracking a target. A target already loading still finishes.
    pub fn unobserve(&self, id: TargetId) {
        self.shared.targets.lock().remove(&id);
        self.shared.settled.lock().retain(|(settled_id, _)| *settled_id != id);
    }

    // == Visibility ==
    /// Feeds a batch of visibility samples.
    ///
    /// Observed targets inside their priority margin, or visible past the
    /// threshold, are queued closest-first. Queued targets are no longer
    /// observed, so later samples for them are ignored. Returns how many
    /// targets were queued.
    pub fn report_visibility(&self, reports: &[VisibilityReport]) -> usize {
        if self.is_disconnected() {
            return 0;
        }

        let mut ordered: Vec<&VisibilityReport> = reports.iter().collect();
        ordered.sort_by(|a, b| a.distance_px.total_cmp(&b.distance_px));

        let mut queued = 0;
        let mut targets = self.shared.targets.lock();
        for report in ordered {
            let Some(managed) = targets.get_mut(&report.id) else {
                continue;
            };
            if managed.state != TargetState::Observed {
                continue;
            }

            let near = report.distance_px <= managed.priority.root_margin();
            let visible = report.visible_ratio >= self.threshold;
            if !(near || visible) {
                continue;
            }

            managed.state = TargetState::Queued;
            if self.queue_tx.send(report.id).is_err() {
                warn!(id = %report.id, "Lazy load worker is gone, dropping target");
                continue;
            }
            queued += 1;
        }

        if queued > 0 {
            debug!(queued, "Queued targets for loading");
        }
        queued
    }

    // == Inspection ==
    /// Current state of `id`. Settled targets are reported while they
    /// remain in the recent-outcome history.
    pub fn state(&self, id: TargetId) -> Option<TargetState> {
        let tracked = self.shared.targets.lock().get(&id).map(|m| m.state);
        tracked.or_else(|| self.shared.settled_outcome(id).map(TargetState::Settled))
    }

    /// Targets still observed, queued or loading.
    pub fn tracked(&self) -> usize {
        self.shared.targets.lock().len()
    }

    /// Targets currently loading.
    pub fn in_flight(&self) -> usize {
        self.count(TargetState::Loading)
    }

    /// Targets queued but not yet admitted.
    pub fn pending(&self) -> usize {
        self.count(TargetState::Queued)
    }

    pub fn is_disconnected(&self) -> bool {
        self.shared.disconnected.load(Ordering::Acquire)
    }

    // == Disconnect ==
    /// Drops every observation and abandons queued and in-flight work.
    ///
    /// Safe to call repeatedly; nothing transitions afterwards.
    pub fn disconnect(&self) {
        if self.shared.disconnected.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
        }
        let dropped = {
            let mut targets = self.shared.targets.lock();
            let count = targets.len();
            targets.clear();
            count
        };
        self.shared.settled.lock().clear();
        debug!(dropped, "Lazy load scheduler disconnected");
    }

    fn count(&self, state: TargetState) -> usize {
        self.shared
            .targets
            .lock()
            .values()
            .filter(|m| m.state == state)
            .count()
    }
}

impl Drop for LazyLoadScheduler {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for LazyLoadScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyLoadScheduler")
            .field("threshold", &self.threshold)
            .field("disconnected", &self.is_disconnected())
            .finish_non_exhaustive()
    }
}

/// Drains queued ids, admitting one per free permit.
///
/// In-flight activations live in a `JoinSet`, so aborting this task aborts
/// them too.
async fn run_worker(
    shared: Arc<Shared>,
    mut queue_rx: mpsc::UnboundedReceiver<TargetId>,
    semaphore: Arc<Semaphore>,
    delay: Duration,
) {
    let mut queue: VecDeque<TargetId> = VecDeque::new();
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            id = queue_rx.recv() => {
                match id {
                    Some(id) => queue.push_back(id),
                    None => break,
                }
            }
            Ok(permit) = semaphore.clone().acquire_owned(), if !queue.is_empty() => {
                let Some(id) = queue.pop_front() else {
                    continue;
                };
                // Unobserved or already handled; the permit goes straight back
                let Some((target, pending)) = shared.begin_loading(id) else {
                    continue;
                };

                let shared = shared.clone();
                in_flight.spawn(async move {
                    tokio::time::sleep(delay).await;
                    let outcome = match target.activate(&pending).await {
                        Ok(()) => LoadOutcome::Loaded,
                        Err(e) => {
                            debug!(id = %id, error = %e, "Target activation failed");
                            LoadOutcome::Errored
                        }
                    };
                    shared.settle(id, outcome);
                    drop(permit);
                });
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }
}
