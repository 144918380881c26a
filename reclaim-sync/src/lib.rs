//! reclaim-sync library interface
//!
//! Reconciles the media catalog against the series/movie back-ends and keeps a
//! deletion score per library item. Exposed as a library for the binary and
//! for integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod matching;
pub mod models;
pub mod playback;
pub mod scoring;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use reclaim_common::events::EventBus;
use services::Sources;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use workflow::{ProgressRegistry, ReconcileOptions, ScoreRecalculator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub event_bus: EventBus,
    pub sources: Arc<Sources>,
    pub options: ReconcileOptions,
    pub progress: ProgressRegistry,
    pub recalculator: ScoreRecalculator,
    /// Cancellation tokens for active runs
    pub cancellation_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last run error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        sources: Sources,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            recalculator: ScoreRecalculator::new(db.clone(), sources.clone(), event_bus.clone()),
            progress: ProgressRegistry::new().with_events(event_bus.clone()),
            db,
            event_bus,
            sources: Arc::new(sources),
            options,
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::reconcile_routes())
        .merge(api::score_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
