use axum::{
    extract::Request,
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorMessage, HttpError};

/// Set by the upstream identity gateway once the user is authenticated.
pub const CALLER_ID_HEADER: &str = "x-caller-id";

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct CallerIdentity {
    pub user_id: Uuid,
}

pub async fn caller_identity(mut req: Request, next: Next) -> Result<impl IntoResponse, HttpError> {
    let raw = req
        .headers()
        .get(CALLER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::CallerIdentityMissing.to_string()))?;

    let user_id = Uuid::parse_str(raw)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidCallerIdentity.to_string()))?;

    if user_id.is_nil() {
        return Err(HttpError::unauthorized(ErrorMessage::CallerNotIdentified.to_string()));
    }

    req.extensions_mut().insert(CallerIdentity { user_id });
    Ok(next.run(req).await)
}
