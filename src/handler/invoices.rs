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
    service::invoice_service::{InvoiceHeader, LineItemInput},
    utils::decimal::{decimal_from_f64, money_from_f64},
    AppState
};

pub fn invoices_handler() -> Router {
    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/from-time-entries", post(create_invoice_from_time_entries))
        .route("/:invoice_id", get(get_invoice))
        .route("/:invoice_id/status", put(update_invoice_status))
}

fn decimal_field(value: f64, field: &str) -> Result<BigDecimal, HttpError> {
    decimal_from_f64(value)
        .ok_or_else(|| HttpError::bad_request(format!("{} is not a valid number", field)))
}

fn to_line_item(item: LineItemDto) -> Result<LineItemInput, HttpError> {
    item.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    Ok(LineItemInput {
        quantity: decimal_field(item.quantity, "Quantity")?,
        rate: decimal_field(item.rate, "Rate")?,
        amount: match item.amount {
            Some(amount) => Some(
                money_from_f64(amount)
                    .ok_or_else(|| HttpError::bad_request("Amount is not a valid number"))?,
            ),
            None => None,
        },
        description: item.description,
    })
}

/// The caller is the contractor billing `business_id`.
pub async fn create_invoice(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<CreateInvoiceDto>
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let line_items = body
        .line_items
        .into_iter()
        .map(to_line_item)
        .collect::<Result<Vec<_>, _>>()?;

    let invoice = app_state
        .invoice_service
        .create_invoice(
            InvoiceHeader {
                contractor_id: caller.user_id,
                business_id: body.business_id,
                job_id: body.job_id,
                notes: body.notes,
            },
            line_items,
        )
        .await?;

    Ok(Json(ApiResponse::success("Invoice created", invoice)))
}

pub async fn create_invoice_from_time_entries(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<InvoiceFromTimeEntriesDto>
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let hourly_rate = decimal_field(body.hourly_rate, "Hourly rate")?;

    let invoice = app_state
        .invoice_service
        .compose_from_time_entries(
            caller.user_id,
            body.business_id,
            body.job_id,
            hourly_rate,
            body.from,
            body.to,
        )
        .await?;

    Ok(Json(ApiResponse::success("Invoice created from time entries", invoice)))
}

pub async fn get_invoice(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(invoice_id): Path<Uuid>
) -> Result<impl IntoResponse, HttpError> {
    let invoice = app_state
        .invoice_service
        .get_invoice_details(invoice_id, caller.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Invoice retrieved", invoice)))
}

pub async fn update_invoice_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(invoice_id): Path<Uuid>,
    Json(body): Json<UpdateInvoiceStatusDto>
) -> Result<impl IntoResponse, HttpError> {
    let invoice = app_state
        .invoice_service
        .update_status(invoice_id, caller.user_id, body.status)
        .await?;

    Ok(Json(ApiResponse::success("Invoice status updated", invoice)))
}

pub async fn list_invoices(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>
) -> Result<impl IntoResponse, HttpError> {
    let invoices = app_state.invoice_service.list_for_user(caller.user_id).await?;

    Ok(Json(ApiResponse::success("Invoices retrieved", invoices)))
}
