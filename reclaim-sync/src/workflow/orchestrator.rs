//! Reconciliation run
//!
//! 1. INITIALIZING: back-end collections fetched concurrently, settings and
//!    folder space loaded concurrently, provider-id index built
//! 2. ENUMERATING_CATALOG: catalog paged once
//! 3. PROCESSING_ITEMS: per item, strictly sequential,
//!    match → enrich → aggregate → score → persist
//! 4. COMPLETE
//!
//! With no enabled catalog or no enabled back-end the run ends at once with an
//! empty report. Cancellation is checked between items only.

use crate::db;
use crate::matching::{enrichment, match_item, MatchOutcome, ProviderIndex};
use crate::models::{
    CatalogItem, DeletionScoreSettings, FolderSpace, MovieEntry, ProcessedItem, RunPhase,
    SeriesEntry,
};
use crate::playback::{PlaybackAggregator, DEFAULT_QUERY_TIMEOUT};
use crate::scoring::{folder_space, DeletionScoreCalculator, ScoreInputs};
use crate::services::Sources;
use crate::workflow::backends;
use crate::workflow::progress::ProgressHandle;
use chrono::Utc;
use futures::future::join_all;
use reclaim_common::events::{EventBus, ReclaimEvent};
use reclaim_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const COMPONENT: &str = "orchestrator";

/// Error recorded on a run stopped through its cancellation token
pub const CANCELLED: &str = "cancelled";

/// Per-run knobs
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Cap on processed catalog items
    pub item_limit: Option<usize>,
    pub playback_timeout: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            item_limit: None,
            playback_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub run_id: Uuid,
    pub items: Vec<ProcessedItem>,
    pub stored: usize,
    pub failed: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub cancelled: bool,
}

/// Runs the reconciliation pipeline
pub struct ReconcileOrchestrator {
    db: SqlitePool,
    sources: Sources,
    events: EventBus,
    options: ReconcileOptions,
}

impl ReconcileOrchestrator {
    pub fn new(db: SqlitePool, sources: Sources, events: EventBus, options: ReconcileOptions) -> Self {
        Self {
            db,
            sources,
            events,
            options,
        }
    }

    /// Execute one run, reporting through `progress`
    ///
    /// The progress record always ends COMPLETE, with `error` set when the run
    /// was cancelled or aborted.
    pub async fn run(
        &self,
        progress: ProgressHandle,
        cancel: CancellationToken,
    ) -> Result<ReconcileReport> {
        let run_id = progress.run_id();
        self.events.emit_lossy(ReclaimEvent::ReconcileStarted {
            run_id,
            timestamp: Utc::now(),
        });
        tracing::info!(run_id = %run_id, "Reconciliation run started");

        let result = self.execute(&progress, &cancel).await;

        let (error, report) = match &result {
            Ok(report) if report.cancelled => (Some(CANCELLED.to_string()), Some(report)),
            Ok(report) => (None, Some(report)),
            Err(e) => (Some(e.to_string()), None),
        };

        if let Some(message) = error.as_deref().filter(|m| *m != CANCELLED) {
            tracing::error!(run_id = %run_id, error = %message, "Reconciliation run aborted");
            self.events.error(COMPONENT, format!("Run {} aborted: {}", run_id, message));
        }

        self.events.emit_lossy(ReclaimEvent::ReconcileCompleted {
            run_id,
            processed: report.map(|r| r.items.len()).unwrap_or(0),
            stored: report.map(|r| r.stored).unwrap_or(0),
            failed: report.map(|r| r.failed).unwrap_or(0),
            cancelled: report.map(|r| r.cancelled).unwrap_or(false),
            timestamp: Utc::now(),
        });
        progress.finish(error).await;

        if let Ok(report) = &result {
            tracing::info!(
                run_id = %run_id,
                processed = report.items.len(),
                stored = report.stored,
                failed = report.failed,
                matched = report.matched,
                unmatched = report.unmatched,
                cancelled = report.cancelled,
                "Reconciliation run finished"
            );
        }

        result
    }

    async fn execute(
        &self,
        progress: &ProgressHandle,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport {
            run_id: progress.run_id(),
            ..Default::default()
        };

        let catalog = match (&self.sources.catalog, self.sources.is_configured()) {
            (Some(catalog), true) => catalog.clone(),
            _ => {
                tracing::warn!("No enabled catalog or back-end configured; nothing to reconcile");
                self.events
                    .warning(COMPONENT, "No enabled catalog or back-end configured");
                return Ok(report);
            }
        };

        progress.set_phase(RunPhase::Initializing).await;
        let ((series, movies), settings_and_space) =
            futures::join!(self.fetch_collections(), self.load_settings_and_space());
        let (settings, folder_spaces) = settings_and_space?;
        let index = ProviderIndex::build(series, movies);

        progress.set_phase(RunPhase::EnumeratingCatalog).await;
        let mut items = catalog
            .list_items()
            .await
            .map_err(|e| Error::Internal(format!("Catalog enumeration failed: {}", e)))?;
        if let Some(limit) = self.options.item_limit {
            items.truncate(limit);
        }
        let total = items.len();
        progress.update(0, total, "").await;

        progress.set_phase(RunPhase::ProcessingItems).await;
        let aggregator = PlaybackAggregator::new(catalog.clone(), self.options.playback_timeout)
            .with_events(self.events.clone());
        let calculator = DeletionScoreCalculator::new(&settings, Utc::now());

        for (idx, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(run_id = %report.run_id, processed = idx, "Run cancelled");
                report.cancelled = true;
                break;
            }

            progress.update(idx, total, &item.title).await;
            let started = Instant::now();

            let (processed, matched_by) = {
                let outcome = match_item(&index, item);
                let matched_by = outcome.matched_by();
                let mut processed = ProcessedItem::from_catalog(item, catalog.name());
                apply_match(&mut processed, outcome);
                (processed, matched_by)
            };
            let processed = self
                .finish_item(processed, item, &aggregator, &calculator, &folder_spaces)
                .await;

            if matched_by.is_some() {
                report.matched += 1;
            } else {
                report.unmatched += 1;
            }

            let stored = match db::media_items::upsert_item(&self.db, &processed).await {
                Ok(_) => {
                    report.stored += 1;
                    true
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        title = %processed.title,
                        catalog_id = %processed.catalog_id,
                        source = %processed.source,
                        error = %e,
                        "Failed to store media item"
                    );
                    self.events.error(
                        "storage",
                        format!("Failed to store {}: {}", processed.title, e),
                    );
                    false
                }
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            let matched_label = matched_by.map(|m| m.as_str()).unwrap_or("none");
            tracing::info!(
                title = %processed.title,
                kind = %processed.kind,
                matched_by = matched_label,
                playback_found = processed.playback.found(),
                score = ?processed.deletion_score(),
                stored,
                elapsed_ms,
                "Processed item"
            );
            self.events.emit_lossy(ReclaimEvent::ItemProcessed {
                run_id: report.run_id,
                title: processed.title.clone(),
                media_type: processed.kind.as_str().to_string(),
                matched_by: matched_by.map(|m| m.to_string()),
                playback_found: processed.playback.found(),
                deletion_score: processed.deletion_score(),
                stored,
                elapsed_ms,
            });

            report.items.push(processed);
            progress.update(idx + 1, total, &item.title).await;
        }

        Ok(report)
    }

    /// Aggregate playback, resolve folder space and score
    async fn finish_item(
        &self,
        mut processed: ProcessedItem,
        item: &CatalogItem,
        aggregator: &PlaybackAggregator,
        calculator: &DeletionScoreCalculator<'_>,
        folder_spaces: &[FolderSpace],
    ) -> ProcessedItem {
        processed.playback = aggregator.for_item(item).await;
        processed.folder_remaining_percent =
            folder_space::remaining_percent(&processed.parent_folder, folder_spaces);
        processed.score = calculator.calculate(&ScoreInputs::from(&processed));
        processed
    }

    /// Full series and movie collections from every enabled instance
    ///
    /// An instance that fails contributes nothing; its items stay unmatched.
    async fn fetch_collections(&self) -> (Vec<SeriesEntry>, Vec<MovieEntry>) {
        let series_futures = self.sources.series_backends.iter().map(|backend| async move {
            match backend.list_series().await {
                Ok(series) => series,
                Err(e) => {
                    self.warn_backend(backend.name(), "series collection", &e.to_string());
                    Vec::new()
                }
            }
        });
        let movie_futures = self.sources.movie_backends.iter().map(|backend| async move {
            match backend.list_movies().await {
                Ok(movies) => movies,
                Err(e) => {
                    self.warn_backend(backend.name(), "movie collection", &e.to_string());
                    Vec::new()
                }
            }
        });

        let (series, movies) = futures::join!(join_all(series_futures), join_all(movie_futures));
        (
            series.into_iter().flatten().collect(),
            movies.into_iter().flatten().collect(),
        )
    }

    async fn load_settings_and_space(&self) -> Result<(DeletionScoreSettings, Vec<FolderSpace>)> {
        let (settings, spaces) = futures::join!(
            db::settings::load_deletion_score_settings(&self.db),
            backends::collect_folder_space(&self.sources, &self.events, COMPONENT)
        );
        Ok((settings?, spaces))
    }

    fn warn_backend(&self, instance: &str, what: &str, error: &str) {
        backends::warn_backend(&self.events, COMPONENT, instance, what, error);
    }
}

fn apply_match(processed: &mut ProcessedItem, outcome: MatchOutcome<'_>) {
    match outcome {
        MatchOutcome::Series { entry, .. } => enrichment::enrich_series(processed, entry),
        MatchOutcome::Movie { entry, .. } => enrichment::enrich_movie(processed, entry),
        MatchOutcome::Unmatched => {}
    }
}
