//! Structured event log
//!
//! Components publish [`ReclaimEvent`]s on an [`EventBus`]. Emission is
//! fire-and-forget: nothing in the pipeline reads events back, and having no
//! subscriber is not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Severity of a [`ReclaimEvent::Log`] entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Reclaim event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReclaimEvent {
    /// Free-form entry tagged with the emitting component
    Log {
        level: LogLevel,
        /// Component name, e.g. "orchestrator", "playback", "storage"
        component: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Reconciliation run started
    ReconcileStarted {
        run_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Progress record changed
    ReconcileProgress {
        run_id: Uuid,
        phase: String,
        current: usize,
        total: usize,
        percentage: u8,
        current_item: String,
    },

    /// One catalog item went through match/enrich/aggregate/score/persist
    ItemProcessed {
        run_id: Uuid,
        title: String,
        media_type: String,
        /// Identifier that produced the back-end match, None when unmatched
        matched_by: Option<String>,
        playback_found: bool,
        deletion_score: Option<f64>,
        stored: bool,
        elapsed_ms: u64,
    },

    /// Reconciliation run finished (normally, cancelled, or aborted)
    ReconcileCompleted {
        run_id: Uuid,
        processed: usize,
        stored: usize,
        failed: usize,
        cancelled: bool,
        timestamp: DateTime<Utc>,
    },

    /// Score recalculation job started
    ScoreRecalculationStarted {
        job_id: Uuid,
        total_items: usize,
        timestamp: DateTime<Utc>,
    },

    /// Score recalculation job finished
    ScoreRecalculationCompleted {
        job_id: Uuid,
        processed: usize,
        updated: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`ReclaimEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReclaimEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ReclaimEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ReclaimEvent,
    ) -> Result<usize, broadcast::error::SendError<ReclaimEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ReclaimEvent) {
        let _ = self.tx.send(event);
    }

    /// Emit a component-tagged log entry
    pub fn log(&self, level: LogLevel, component: &str, message: impl Into<String>) {
        self.emit_lossy(ReclaimEvent::Log {
            level,
            component: component.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn info(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Info, component, message);
    }

    pub fn warning(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Warning, component, message);
    }

    pub fn error(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Error, component, message);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
