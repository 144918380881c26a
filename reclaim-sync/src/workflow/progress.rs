//! Per-run progress tracking
//!
//! Each run owns a [`ProgressHandle`]; the [`ProgressRegistry`] keeps every
//! run's latest [`RunProgress`] keyed by run id so the HTTP surface can poll it.

use crate::models::{RunPhase, RunProgress};
use reclaim_common::events::{EventBus, ReclaimEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

type RunMap = Arc<RwLock<HashMap<Uuid, RunProgress>>>;

/// Finished runs kept for polling; older ones go on the next registration
pub const MAX_FINISHED_RUNS: usize = 20;

fn insert_run(runs: &mut HashMap<Uuid, RunProgress>) -> Uuid {
    prune_finished(runs);
    let run_id = Uuid::new_v4();
    runs.insert(run_id, RunProgress::new(run_id));
    run_id
}

fn prune_finished(runs: &mut HashMap<Uuid, RunProgress>) {
    let mut finished: Vec<_> = runs
        .values()
        .filter(|p| p.is_complete)
        .map(|p| (p.ended_at.unwrap_or(p.started_at), p.run_id))
        .collect();
    if finished.len() <= MAX_FINISHED_RUNS {
        return;
    }

    finished.sort();
    let excess = finished.len() - MAX_FINISHED_RUNS;
    for (_, run_id) in finished.into_iter().take(excess) {
        runs.remove(&run_id);
    }
}

/// Registry of run progress records
#[derive(Debug, Clone, Default)]
pub struct ProgressRegistry {
    runs: RunMap,
    events: Option<EventBus>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish progress changes as `ReconcileProgress` events
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Register a new run in the INITIALIZING phase
    pub async fn register(&self) -> ProgressHandle {
        let run_id = insert_run(&mut *self.runs.write().await);
        self.handle(run_id)
    }

    /// Register a new run unless one is still active
    ///
    /// The check and the insert happen under one lock, so concurrent callers
    /// cannot both get a handle.
    pub async fn try_register(&self) -> Option<ProgressHandle> {
        let mut runs = self.runs.write().await;
        if runs.values().any(|p| !p.is_complete) {
            return None;
        }
        let run_id = insert_run(&mut runs);
        drop(runs);
        Some(self.handle(run_id))
    }

    fn handle(&self, run_id: Uuid) -> ProgressHandle {
        ProgressHandle {
            run_id,
            runs: self.runs.clone(),
            events: self.events.clone(),
        }
    }

    pub async fn get(&self, run_id: Uuid) -> Option<RunProgress> {
        self.runs.read().await.get(&run_id).cloned()
    }

    /// Runs that have not reached COMPLETE
    pub async fn active_runs(&self) -> Vec<RunProgress> {
        self.runs
            .read()
            .await
            .values()
            .filter(|p| !p.is_complete)
            .cloned()
            .collect()
    }

    /// Advisory only; use [`ProgressRegistry::try_register`] to start a run
    pub async fn has_active_run(&self) -> bool {
        self.runs.read().await.values().any(|p| !p.is_complete)
    }

    pub async fn remove(&self, run_id: Uuid) -> Option<RunProgress> {
        self.runs.write().await.remove(&run_id)
    }
}

/// Write access to one run's progress record
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    run_id: Uuid,
    runs: RunMap,
    events: Option<EventBus>,
}

impl ProgressHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    async fn modify<F>(&self, f: F) -> RunProgress
    where
        F: FnOnce(&mut RunProgress),
    {
        let mut runs = self.runs.write().await;
        let progress = runs
            .entry(self.run_id)
            .or_insert_with(|| RunProgress::new(self.run_id));
        f(progress);
        progress.clone()
    }

    fn publish(&self, progress: &RunProgress) {
        if let Some(events) = &self.events {
            events.emit_lossy(ReclaimEvent::ReconcileProgress {
                run_id: progress.run_id,
                phase: progress.phase.as_str().to_string(),
                current: progress.current,
                total: progress.total,
                percentage: progress.percentage,
                current_item: progress.current_item.clone(),
            });
        }
    }

    pub async fn set_phase(&self, phase: RunPhase) {
        let progress = self.modify(|p| p.phase = phase).await;
        self.publish(&progress);
    }

    pub async fn update(&self, current: usize, total: usize, current_item: &str) {
        let progress = self.modify(|p| p.update(current, total, current_item)).await;
        self.publish(&progress);
    }

    /// Mark the run complete; `error` records why it stopped early
    pub async fn finish(&self, error: Option<String>) {
        let progress = self.modify(|p| p.finish(error)).await;
        self.publish(&progress);
    }

    pub async fn snapshot(&self) -> Option<RunProgress> {
        self.runs.read().await.get(&self.run_id).cloned()
    }
}
