//! Standalone score recalculation
//!
//! Rescores every stored row with the current settings and freshly fetched
//! folder space, in batches, and writes only rows whose score moved by more
//! than 0.01 or whose folder percentage changed. Submitted as a background job; the returned handle can be awaited.
//! One job at a time; a settings change during a job queues one more pass.

use crate::db;
use crate::models::ScoreBreakdown;
use crate::scoring::{folder_space, DeletionScoreCalculator};
use crate::services::Sources;
use crate::workflow::backends;
use chrono::{DateTime, Utc};
use reclaim_common::events::{EventBus, ReclaimEvent};
use reclaim_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Minimum change in total score that is written back
pub const SCORE_CHANGE_EPSILON: f64 = 0.01;

const COMPONENT: &str = "recalculation";

/// Final counts of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecalcSummary {
    pub job_id: Uuid,
    pub processed: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Latest job state for polling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecalcStatus {
    pub job_id: Uuid,
    pub running: bool,
    pub processed: usize,
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Submitted job
pub struct RecalculationHandle {
    pub job_id: Uuid,
    pub handle: JoinHandle<Result<RecalcSummary>>,
}

impl RecalculationHandle {
    /// Wait for the job to finish
    pub async fn wait(self) -> Result<RecalcSummary> {
        self.handle
            .await
            .map_err(|e| Error::Internal(format!("Recalculation task failed: {}", e)))?
    }
}

/// Clears the running flag however the job ends
struct RunningGuard(Option<Arc<AtomicBool>>);

impl RunningGuard {
    fn release(&mut self) {
        if let Some(flag) = self.0.take() {
            flag.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.release();
    }
}

fn score_changed(old: Option<f64>, new: Option<&ScoreBreakdown>) -> bool {
    match (old, new.map(|b| b.total_score)) {
        (Some(old), Some(new)) => (old - new).abs() > SCORE_CHANGE_EPSILON,
        (None, None) => false,
        _ => true,
    }
}

/// Submits and tracks recalculation jobs
#[derive(Clone)]
pub struct ScoreRecalculator {
    db: SqlitePool,
    sources: Sources,
    events: EventBus,
    running: Arc<AtomicBool>,
    rerun_requested: Arc<AtomicBool>,
    status: Arc<RwLock<Option<RecalcStatus>>>,
}

impl ScoreRecalculator {
    /// `sources` supplies current folder space; with no back-ends the stored
    /// folder percentages are reused
    pub fn new(db: SqlitePool, sources: Sources, events: EventBus) -> Self {
        Self {
            db,
            sources,
            events,
            running: Arc::new(AtomicBool::new(false)),
            rerun_requested: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// State of the current or most recent job
    pub async fn status(&self) -> Option<RecalcStatus> {
        self.status.read().await.clone()
    }

    /// Start a job in the background; None when one is already running
    pub fn submit(&self) -> Option<RecalculationHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Score recalculation already running");
            return None;
        }

        let job_id = Uuid::new_v4();
        let guard = RunningGuard(Some(self.running.clone()));
        let this = self.clone();

        let handle = tokio::spawn(async move {
            let mut guard = guard;
            loop {
                let result = this.execute(job_id).await;
                if let Err(e) = &result {
                    tracing::error!(job_id = %job_id, error = %e, "Score recalculation failed");
                    this.events
                        .error(COMPONENT, format!("Job {} failed: {}", job_id, e));
                    this.set_status(|s| {
                        s.running = false;
                        s.finished_at = Some(Utc::now());
                        s.error = Some(e.to_string());
                    })
                    .await;
                }

                if this.rerun_requested.swap(false, Ordering::SeqCst) {
                    tracing::info!(job_id = %job_id, "Settings changed during recalculation; running again");
                    continue;
                }

                guard.release();
                // a request may land between the check above and the release
                if this.rerun_requested.swap(false, Ordering::SeqCst)
                    && this
                        .running
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                {
                    guard = RunningGuard(Some(this.running.clone()));
                    continue;
                }

                break result;
            }
        });

        Some(RecalculationHandle { job_id, handle })
    }

    /// Start a job, or have the running one make another pass afterwards
    ///
    /// Used when settings change: the extra pass reloads them, so the stored
    /// scores always end on the latest settings. None when the request was
    /// folded into the running job.
    pub fn submit_or_queue(&self) -> Option<RecalculationHandle> {
        loop {
            if let Some(handle) = self.submit() {
                return Some(handle);
            }
            self.rerun_requested.store(true, Ordering::SeqCst);
            if self.is_running() {
                tracing::debug!("Score recalculation queued behind the running job");
                return None;
            }
            // the job finished in between; start a fresh one instead
            self.rerun_requested.store(false, Ordering::SeqCst);
        }
    }

    async fn set_status<F>(&self, f: F)
    where
        F: FnOnce(&mut RecalcStatus),
    {
        if let Some(status) = self.status.write().await.as_mut() {
            f(status);
        }
    }

    async fn execute(&self, job_id: Uuid) -> Result<RecalcSummary> {
        let started_at = Utc::now();
        *self.status.write().await = Some(RecalcStatus {
            job_id,
            running: true,
            processed: 0,
            total: 0,
            updated: 0,
            failed: 0,
            started_at,
            finished_at: None,
            error: None,
        });

        let (settings, spaces) = futures::join!(
            db::settings::load_deletion_score_settings(&self.db),
            backends::collect_folder_space(&self.sources, &self.events, COMPONENT)
        );
        let settings = settings?;
        let batch_size = db::settings::get_recalculation_batch_size(&self.db).await?;
        let total = db::media_items::count_items(&self.db).await?.max(0) as usize;
        self.set_status(|s| s.total = total).await;

        self.events.emit_lossy(ReclaimEvent::ScoreRecalculationStarted {
            job_id,
            total_items: total,
            timestamp: started_at,
        });
        tracing::info!(
            job_id = %job_id,
            total,
            batch_size,
            folders = spaces.len(),
            "Score recalculation started"
        );

        let calculator = DeletionScoreCalculator::new(&settings, started_at);
        let mut summary = RecalcSummary {
            job_id,
            processed: 0,
            updated: 0,
            failed: 0,
        };
        let mut offset = 0usize;

        loop {
            let rows = db::media_items::list_items(&self.db, batch_size, offset).await?;
            let fetched = rows.len();

            for row in rows {
                let mut inputs = row.score_inputs();
                if !spaces.is_empty() {
                    inputs.folder_remaining_percent =
                        folder_space::remaining_percent(&row.parent_folder, &spaces);
                }
                let breakdown = calculator.calculate(&inputs);

                if score_changed(row.deletion_score, breakdown.as_ref())
                    || inputs.folder_remaining_percent != row.folder_remaining_percent
                {
                    match db::media_items::update_score(
                        &self.db,
                        &row.guid,
                        inputs.folder_remaining_percent,
                        breakdown.as_ref(),
                    )
                    .await
                    {
                        Ok(()) => summary.updated += 1,
                        Err(e) => {
                            summary.failed += 1;
                            tracing::error!(guid = %row.guid, title = %row.title, error = %e, "Failed to update score");
                        }
                    }
                }
                summary.processed += 1;
            }

            let snapshot = summary;
            self.set_status(|s| {
                s.processed = snapshot.processed;
                s.updated = snapshot.updated;
                s.failed = snapshot.failed;
            })
            .await;

            offset += fetched;
            if fetched < batch_size {
                break;
            }
        }

        self.set_status(|s| {
            s.running = false;
            s.finished_at = Some(Utc::now());
        })
        .await;
        self.events.emit_lossy(ReclaimEvent::ScoreRecalculationCompleted {
            job_id,
            processed: summary.processed,
            updated: summary.updated,
            timestamp: Utc::now(),
        });
        tracing::info!(
            job_id = %job_id,
            processed = summary.processed,
            updated = summary.updated,
            failed = summary.failed,
            "Score recalculation finished"
        );

        Ok(summary)
    }
}
