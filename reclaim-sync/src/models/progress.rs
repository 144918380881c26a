//! Reconciliation run state
//!
//! A run progresses through four phases:
//! INITIALIZING → ENUMERATING_CATALOG → PROCESSING_ITEMS → COMPLETE

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    /// Loading settings, back-end collections and folder space
    Initializing,
    /// Paging through the catalog
    EnumeratingCatalog,
    /// Per-item match → enrich → aggregate → score → persist
    ProcessingItems,
    /// Finished, cancelled or aborted
    Complete,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Initializing => "INITIALIZING",
            RunPhase::EnumeratingCatalog => "ENUMERATING_CATALOG",
            RunPhase::ProcessingItems => "PROCESSING_ITEMS",
            RunPhase::Complete => "COMPLETE",
        }
    }
}

/// Snapshot of one run's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    pub run_id: Uuid,
    pub phase: RunPhase,
    pub current: usize,
    pub total: usize,
    pub current_item: String,
    /// 0 - 100
    pub percentage: u8,
    pub is_complete: bool,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RunProgress {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            phase: RunPhase::Initializing,
            current: 0,
            total: 0,
            current_item: String::new(),
            percentage: 0,
            is_complete: false,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Update counters and recompute the percentage
    pub fn update(&mut self, current: usize, total: usize, current_item: impl Into<String>) {
        self.current = current;
        self.total = total;
        self.current_item = current_item.into();
        self.percentage = if total > 0 {
            ((current.min(total) as f64 / total as f64) * 100.0).round() as u8
        } else {
            0
        };
    }

    /// Move to COMPLETE, optionally recording why the run stopped early
    pub fn finish(&mut self, error: Option<String>) {
        self.phase = RunPhase::Complete;
        self.is_complete = true;
        self.error = error;
        self.ended_at = Some(Utc::now());
        if self.error.is_none() {
            self.percentage = 100;
        }
    }
}
