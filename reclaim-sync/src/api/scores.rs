//! Scoring handlers
//!
//! POST /scores/recalculate, GET /scores/recalculate,
//! GET /scores/settings, PUT /scores/settings

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::db::settings::{load_deletion_score_settings, save_deletion_score_settings};
use crate::error::{ApiError, ApiResult};
use crate::models::{Breakpoint, DeletionScoreSettings};
use crate::workflow::RecalcStatus;
use crate::AppState;

/// POST /scores/recalculate response
#[derive(Debug, Serialize)]
pub struct RecalculateResponse {
    pub job_id: Uuid,
}

/// PUT /scores/settings response
#[derive(Debug, Serialize)]
pub struct SaveSettingsResponse {
    pub settings: DeletionScoreSettings,
    /// Job that will apply the new settings
    pub recalculation_job_id: Option<Uuid>,
    /// True when folded into an already running job as an extra pass
    pub recalculation_queued: bool,
}

/// POST /scores/recalculate
///
/// 409 if a job is already running.
pub async fn start_recalculation(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<RecalculateResponse>)> {
    let handle = state.recalculator.submit().ok_or_else(|| {
        ApiError::Conflict("Score recalculation already running".to_string())
    })?;

    tracing::info!(job_id = %handle.job_id, "Score recalculation submitted");

    Ok((
        StatusCode::ACCEPTED,
        Json(RecalculateResponse {
            job_id: handle.job_id,
        }),
    ))
}

/// GET /scores/recalculate
pub async fn recalculation_status(State(state): State<AppState>) -> ApiResult<Json<RecalcStatus>> {
    state
        .recalculator
        .status()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No recalculation has run".to_string()))
}

/// GET /scores/settings
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<DeletionScoreSettings>> {
    Ok(Json(load_deletion_score_settings(&state.db).await?))
}

fn validate_breakpoints(factor: &str, breakpoints: &[Breakpoint]) -> ApiResult<()> {
    for bp in breakpoints {
        if !bp.threshold.is_finite() || !bp.percent.is_finite() {
            return Err(ApiError::BadRequest(format!(
                "{}: breakpoints must be finite numbers",
                factor
            )));
        }
        if !(0.0..=100.0).contains(&bp.percent) {
            return Err(ApiError::BadRequest(format!(
                "{}: breakpoint percent must be within 0-100",
                factor
            )));
        }
    }
    Ok(())
}

/// PUT /scores/settings
///
/// Store new settings and rescore stored items.
pub async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<DeletionScoreSettings>,
) -> ApiResult<Json<SaveSettingsResponse>> {
    for (name, max_points) in [
        ("daysUnwatched", settings.days_unwatched.max_points),
        ("neverWatched", settings.never_watched.max_points),
        ("sizeOnDisk", settings.size_on_disk.max_points),
        ("ageSinceAdded", settings.age_since_added.max_points),
        ("folderSpace", settings.folder_space.max_points),
    ] {
        if !max_points.is_finite() || max_points < 0.0 {
            return Err(ApiError::BadRequest(format!(
                "{}: maxPoints must be a non-negative number",
                name
            )));
        }
    }
    validate_breakpoints("daysUnwatched", &settings.days_unwatched.breakpoints)?;
    validate_breakpoints("sizeOnDisk", &settings.size_on_disk.breakpoints)?;
    validate_breakpoints("ageSinceAdded", &settings.age_since_added.breakpoints)?;
    validate_breakpoints("folderSpace", &settings.folder_space.breakpoints)?;

    save_deletion_score_settings(&state.db, &settings).await?;
    let (job_id, queued) = match state.recalculator.submit_or_queue() {
        Some(handle) => (Some(handle.job_id), false),
        None => (state.recalculator.status().await.map(|s| s.job_id), true),
    };

    tracing::info!(recalculation_job = ?job_id, queued, "Deletion score settings saved");

    Ok(Json(SaveSettingsResponse {
        settings,
        recalculation_job_id: job_id,
        recalculation_queued: queued,
    }))
}

/// Build scoring routes
pub fn score_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/scores/recalculate",
            post(start_recalculation).get(recalculation_status),
        )
        .route("/scores/settings", axum::routing::get(get_settings).put(put_settings))
}
