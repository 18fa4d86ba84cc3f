use std::sync::Arc;
use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router
};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::ledgerdtos::*,
    error::HttpError,
    middleware::CallerIdentity,
    utils::decimal::money_from_f64,
    AppState
};

pub fn engagements_handler() -> Router {
    Router::new()
        .route("/", post(open_engagement).get(list_engagements))
        .route("/fund", post(fund_engagement))
        .route("/:engagement_id", get(get_engagement))
        .route("/:engagement_id/release", put(release_engagement))
        .route("/:engagement_id/reviews", post(rate_engagement).get(list_reviews))
}

fn amount_from(body: &EngagementDto) -> Result<BigDecimal, HttpError> {
    money_from_f64(body.amount).ok_or_else(|| HttpError::bad_request("Amount is not a valid number"))
}

/// The caller is the employer.
pub async fn open_engagement(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<EngagementDto>
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let amount = amount_from(&body)?;

    let engagement = app_state
        .escrow_service
        .open(body.job_id, caller.user_id, body.developer_id, amount)
        .await?;

    Ok(Json(ApiResponse::success("Engagement opened", engagement)))
}

pub async fn fund_engagement(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<EngagementDto>
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let amount = amount_from(&body)?;

    let engagement = app_state
        .escrow_service
        .fund(body.job_id, caller.user_id, body.developer_id, amount)
        .await?;

    Ok(Json(ApiResponse::success("Escrow funded", engagement)))
}

pub async fn release_engagement(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(engagement_id): Path<Uuid>
) -> Result<impl IntoResponse, HttpError> {
    let engagement = app_state
        .escrow_service
        .release(engagement_id, caller.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Payment released", engagement)))
}

pub async fn rate_engagement(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(engagement_id): Path<Uuid>,
    Json(body): Json<RateEngagementDto>
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let review = app_state
        .escrow_service
        .rate(engagement_id, caller.user_id, body.reviewee_id, body.rating, body.comment)
        .await?;

    Ok(Json(ApiResponse::success("Review submitted", review)))
}

pub async fn get_engagement(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(engagement_id): Path<Uuid>
) -> Result<impl IntoResponse, HttpError> {
    let engagement = app_state
        .escrow_service
        .get_for_party(engagement_id, caller.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Engagement retrieved", engagement)))
}

pub async fn list_engagements(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>
) -> Result<impl IntoResponse, HttpError> {
    let engagements = app_state.escrow_service.list_for_user(caller.user_id).await?;

    Ok(Json(ApiResponse::success("Engagements retrieved", engagements)))
}

pub async fn list_reviews(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(engagement_id): Path<Uuid>
) -> Result<impl IntoResponse, HttpError> {
    let reviews = app_state
        .escrow_service
        .list_reviews(engagement_id, caller.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Reviews retrieved", reviews)))
}
