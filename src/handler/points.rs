use std::sync::Arc;
use axum::{
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router
};
use validator::Validate;

use crate::{
    dtos::ledgerdtos::*,
    error::HttpError,
    middleware::CallerIdentity,
    AppState
};

pub fn points_handler() -> Router {
    Router::new()
        .route("/profile", get(get_points_profile))
        .route("/badges", post(award_badge))
}

pub async fn get_points_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>
) -> Result<impl IntoResponse, HttpError> {
    let profile = app_state
        .points_service
        .get_or_create_profile(caller.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Points profile retrieved", profile)))
}

/// Catalog badges only; the points value is not caller-controlled.
pub async fn award_badge(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<AwardBadgeDto>
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let profile = app_state
        .points_service
        .award_catalog_badge(caller.user_id, &body.badge_slug)
        .await?;

    Ok(Json(ApiResponse::success("Badge awarded", profile)))
}
