use thiserror::Error;
use uuid::Uuid;
use crate::{
    db::db::StoreError,
    error::HttpError,
    models::engagementmodel::EngagementPaymentStatus,
};
use axum::http::StatusCode;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Time entry {0} not found")]
    TimeEntryNotFound(Uuid),

    #[error("Engagement {0} not found")]
    EngagementNotFound(Uuid),

    #[error("Invoice {0} not found")]
    InvoiceNotFound(Uuid),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid escrow state transition: engagement {engagement_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        engagement_id: Uuid,
        from: EngagementPaymentStatus,
        to: EngagementPaymentStatus,
    },

    #[error("Job {0} already has a funded engagement")]
    AlreadyFunded(Uuid),

    #[error("User {reviewer_id} has already rated engagement {engagement_id}")]
    AlreadyRated { engagement_id: Uuid, reviewer_id: Uuid },

    #[error("User {0} is not allowed to perform this action on {1}")]
    Forbidden(Uuid, Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable, retry later: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl ServiceError {
    /// Whether the caller may safely repeat the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::StoreUnavailable(_) | ServiceError::Conflict(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_)
            | ServiceError::InvalidState(_)
            | ServiceError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,

            ServiceError::TimeEntryNotFound(_)
            | ServiceError::EngagementNotFound(_)
            | ServiceError::InvoiceNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Forbidden(_, _) => StatusCode::FORBIDDEN,

            ServiceError::AlreadyFunded(_)
            | ServiceError::AlreadyRated { .. }
            | ServiceError::Conflict(_) => StatusCode::CONFLICT,

            ServiceError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation { constraint } => {
                ServiceError::Conflict(format!("unique constraint {} violated", constraint))
            }
            StoreError::Unavailable(message) => ServiceError::StoreUnavailable(message),
            StoreError::Database(message) => ServiceError::Database(message),
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!(error = %error, retryable = error.is_retryable(), "request failed");
        } else if error.is_retryable() {
            tracing::warn!(error = %error, "request hit a retryable conflict");
        }
        HttpError::new(error.to_string(), status)
    }
}
