use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::invoicemodel::InvoiceStatus;

//Time entry DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct StartTimerDto {
    pub job_id: Uuid,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ManualTimeEntryDto {
    pub job_id: Uuid,

    pub date: DateTime<Utc>,

    #[validate(range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes"))]
    pub duration_minutes: i32,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TimeWindowQueryDto {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

//Engagement DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct EngagementDto {
    pub job_id: Uuid,

    pub developer_id: Uuid,

    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RateEngagementDto {
    pub reviewee_id: Uuid,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,

    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: String,
}

//Invoice DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LineItemDto {
    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: String,

    #[validate(range(min = 0.0, message = "Quantity must be positive"))]
    pub quantity: f64,

    #[validate(range(min = 0.0, message = "Rate must not be negative"))]
    pub rate: f64,

    pub amount: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateInvoiceDto {
    pub business_id: Uuid,

    pub job_id: Option<Uuid>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,

    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub line_items: Vec<LineItemDto>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct InvoiceFromTimeEntriesDto {
    pub business_id: Uuid,

    pub job_id: Uuid,

    #[validate(range(min = 0.0, message = "Hourly rate must not be negative"))]
    pub hourly_rate: f64,

    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateInvoiceStatusDto {
    pub status: InvoiceStatus,
}

//Points DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AwardBadgeDto {
    #[validate(length(min = 1, max = 64, message = "Badge slug must be between 1 and 64 characters"))]
    pub badge_slug: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}
