//! Reconciliation run handlers
//!
//! POST /reconcile, GET /reconcile, GET /reconcile/:run_id,
//! POST /reconcile/:run_id/cancel

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{RunPhase, RunProgress};
use crate::workflow::ReconcileOrchestrator;
use crate::AppState;

/// POST /reconcile response
#[derive(Debug, Serialize)]
pub struct StartRunResponse {
    pub run_id: Uuid,
    pub phase: RunPhase,
    pub started_at: DateTime<Utc>,
}

/// GET /reconcile response
#[derive(Debug, Serialize)]
pub struct ActiveRunsResponse {
    pub active: Vec<RunProgress>,
}

/// POST /reconcile/:run_id/cancel response
#[derive(Debug, Serialize)]
pub struct CancelRunResponse {
    pub run_id: Uuid,
    pub cancel_requested: bool,
}

/// POST /reconcile
///
/// Start a run in the background. 409 if one is already active.
pub async fn start_run(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<StartRunResponse>)> {
    let handle = state.progress.try_register().await.ok_or_else(|| {
        ApiError::Conflict("Reconciliation run already active".to_string())
    })?;
    let run_id = handle.run_id();
    let token = CancellationToken::new();
    state
        .cancellation_tokens
        .write()
        .await
        .insert(run_id, token.clone());

    let started_at = handle
        .snapshot()
        .await
        .map(|p| p.started_at)
        .unwrap_or_else(Utc::now);

    let orchestrator = ReconcileOrchestrator::new(
        state.db.clone(),
        (*state.sources).clone(),
        state.event_bus.clone(),
        state.options.clone(),
    );

    let state_clone = state.clone();
    tokio::spawn(async move {
        tracing::info!(run_id = %run_id, "Background reconciliation task started");

        match orchestrator.run(handle, token).await {
            Ok(report) => {
                tracing::info!(
                    run_id = %run_id,
                    stored = report.stored,
                    failed = report.failed,
                    "Background reconciliation task completed"
                );
            }
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Background reconciliation task failed");
                *state_clone.last_error.write().await = Some(e.to_string());
            }
        }

        state_clone.cancellation_tokens.write().await.remove(&run_id);
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(StartRunResponse {
            run_id,
            phase: RunPhase::Initializing,
            started_at,
        }),
    ))
}

/// GET /reconcile/:run_id
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<RunProgress>> {
    state
        .progress
        .get(run_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Run not found: {}", run_id)))
}

/// GET /reconcile
pub async fn list_active_runs(State(state): State<AppState>) -> Json<ActiveRunsResponse> {
    Json(ActiveRunsResponse {
        active: state.progress.active_runs().await,
    })
}

/// POST /reconcile/:run_id/cancel
///
/// Takes effect before the next item.
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<CancelRunResponse>> {
    let progress = state
        .progress
        .get(run_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Run not found: {}", run_id)))?;

    if progress.is_complete {
        return Err(ApiError::BadRequest(format!(
            "Run already complete: {}",
            run_id
        )));
    }

    let tokens = state.cancellation_tokens.read().await;
    let token = tokens
        .get(&run_id)
        .ok_or_else(|| ApiError::NotFound(format!("No cancellation token for run {}", run_id)))?;
    token.cancel();

    tracing::info!(run_id = %run_id, "Run cancellation requested");

    Ok(Json(CancelRunResponse {
        run_id,
        cancel_requested: true,
    }))
}

/// Build reconciliation routes
pub fn reconcile_routes() -> Router<AppState> {
    Router::new()
        .route("/reconcile", post(start_run).get(list_active_runs))
        .route("/reconcile/:run_id", get(get_run))
        .route("/reconcile/:run_id/cancel", post(cancel_run))
}
