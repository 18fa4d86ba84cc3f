use std::sync::Arc;
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::ledgerdtos::*,
    error::HttpError,
    middleware::CallerIdentity,
    AppState
};

pub fn time_entries_handler() -> Router {
    Router::new()
        .route("/", get(list_time_entries))
        .route("/start", post(start_timer))
        .route("/manual", post(record_manual_entry))
        .route("/active", get(get_active_timer))
        .route("/:entry_id/stop", put(stop_timer))
}

pub async fn start_timer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<StartTimerDto>
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let entry = app_state
        .time_service
        .start_timer(caller.user_id, body.job_id, body.notes)
        .await?;

    Ok(Json(ApiResponse::success("Timer started", entry)))
}

pub async fn stop_timer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(entry_id): Path<Uuid>
) -> Result<impl IntoResponse, HttpError> {
    let entry = app_state
        .time_service
        .stop_timer(caller.user_id, entry_id)
        .await?;

    Ok(Json(ApiResponse::success("Timer stopped", entry)))
}

pub async fn record_manual_entry(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<ManualTimeEntryDto>
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let entry = app_state
        .time_service
        .record_manual(caller.user_id, body.job_id, body.date, body.duration_minutes, body.notes)
        .await?;

    Ok(Json(ApiResponse::success("Time entry recorded", entry)))
}

pub async fn get_active_timer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>
) -> Result<impl IntoResponse, HttpError> {
    let entry = app_state.time_service.get_active(caller.user_id).await?;

    Ok(Json(ApiResponse::success("Active timer retrieved", entry)))
}

pub async fn list_time_entries(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Query(window): Query<TimeWindowQueryDto>
) -> Result<impl IntoResponse, HttpError> {
    let entries = app_state
        .time_service
        .list(caller.user_id, window.from, window.to)
        .await?;

    Ok(Json(ApiResponse::success("Time entries retrieved", entries)))
}
