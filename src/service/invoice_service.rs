// service/invoice_service.rs
use std::sync::Arc;
use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::invoicedb::InvoiceExt,
    models::invoicemodel::*,
    service::{
        error::ServiceError, notification_service::NotificationService,
        time_service::TimeEntryService,
    },
    utils::decimal::{is_negative, is_positive, line_amount, minutes_to_hours, to_money},
};

const MAX_DESCRIPTION_LEN: usize = 500;

/// Who bills whom, before any line item is attached.
#[derive(Debug, Clone)]
pub struct InvoiceHeader {
    pub contractor_id: Uuid,
    pub business_id: Uuid,
    pub job_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// A line item as submitted. `amount` is optional and only checked.
#[derive(Debug, Clone)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: BigDecimal,
    pub rate: BigDecimal,
    pub amount: Option<BigDecimal>,
}

#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn InvoiceExt>,
    time_service: Arc<TimeEntryService>,
    notification_service: Arc<NotificationService>,
}

impl std::fmt::Debug for InvoiceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvoiceService").finish()
    }
}

fn validate_line_item(position: usize, item: LineItemInput) -> Result<NewLineItem, ServiceError> {
    let description = item.description.trim().to_string();
    if description.is_empty() {
        return Err(ServiceError::Validation(format!(
            "line item {}: description is required",
            position
        )));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ServiceError::Validation(format!(
            "line item {}: description must be at most {} characters",
            position, MAX_DESCRIPTION_LEN
        )));
    }
    if !is_positive(&item.quantity) {
        return Err(ServiceError::Validation(format!(
            "line item {}: quantity must be greater than 0",
            position
        )));
    }
    if is_negative(&item.rate) {
        return Err(ServiceError::Validation(format!(
            "line item {}: rate must not be negative",
            position
        )));
    }

    // the stored rate is the cent-rounded one, so the amount must be too
    let rate = to_money(&item.rate);
    let amount = line_amount(&item.quantity, &rate);
    if let Some(claimed) = &item.amount {
        if to_money(claimed) != amount {
            return Err(ServiceError::Validation(format!(
                "line item {}: amount {} does not equal quantity x rate ({})",
                position, claimed, amount
            )));
        }
    }

    Ok(NewLineItem {
        description,
        quantity: item.quantity,
        rate,
        amount,
    })
}

impl InvoiceService {
    pub fn new(
        store: Arc<dyn InvoiceExt>,
        time_service: Arc<TimeEntryService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            store,
            time_service,
            notification_service,
        }
    }

    /// Validates every line, recomputes amounts and writes the header with
    /// its items as one unit.
    pub async fn create_invoice(
        &self,
        header: InvoiceHeader,
        line_items: Vec<LineItemInput>,
    ) -> Result<InvoiceWithItems, ServiceError> {
        if header.contractor_id == header.business_id {
            return Err(ServiceError::Validation(
                "contractor and business must be different users".to_string(),
            ));
        }
        if line_items.is_empty() {
            return Err(ServiceError::Validation(
                "an invoice needs at least one line item".to_string(),
            ));
        }

        let items = line_items
            .into_iter()
            .enumerate()
            .map(|(position, item)| validate_line_item(position, item))
            .collect::<Result<Vec<_>, _>>()?;

        let total_amount = to_money(
            &items
                .iter()
                .fold(BigDecimal::from(0), |acc, item| acc + &item.amount),
        );

        let new_invoice = NewInvoice {
            contractor_id: header.contractor_id,
            business_id: header.business_id,
            job_id: header.job_id,
            notes: header.notes,
            total_amount,
        };

        let created = self.store.insert_invoice(&new_invoice, &items).await?;

        tracing::info!(
            invoice_id = %created.invoice.id,
            contractor_id = %created.invoice.contractor_id,
            line_items = created.line_items.len(),
            total_amount = %created.invoice.total_amount,
            "invoice created"
        );
        self.notification_service.notify_invoice_created(&created.invoice).await;

        Ok(created)
    }

    /// Bills the completed time of one job at `hourly_rate`, one line per entry.
    pub async fn compose_from_time_entries(
        &self,
        contractor_id: Uuid,
        business_id: Uuid,
        job_id: Uuid,
        hourly_rate: BigDecimal,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<InvoiceWithItems, ServiceError> {
        let entries = self
            .time_service
            .completed_for_job(contractor_id, job_id, from, to)
            .await?;

        // zero-length entries (instant stops, clamped skew) carry nothing billable
        let line_items: Vec<LineItemInput> = entries
            .iter()
            .filter(|entry| entry.duration_minutes > 0)
            .map(|entry| LineItemInput {
                description: entry
                    .notes
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("Work on {}", entry.start_time.format("%Y-%m-%d"))),
                quantity: minutes_to_hours(entry.duration_minutes),
                rate: hourly_rate.clone(),
                amount: None,
            })
            .collect();

        if line_items.is_empty() {
            return Err(ServiceError::Validation(format!(
                "no billable time entries to invoice for job {}",
                job_id
            )));
        }

        self.create_invoice(
            InvoiceHeader {
                contractor_id,
                business_id,
                job_id: Some(job_id),
                notes: None,
            },
            line_items,
        )
        .await
    }

    /// Header plus ordered line items. Only the two parties may read it.
    pub async fn get_invoice_details(
        &self,
        invoice_id: Uuid,
        caller_id: Uuid,
    ) -> Result<InvoiceWithItems, ServiceError> {
        let invoice = self
            .store
            .get_invoice(invoice_id)
            .await?
            .ok_or(ServiceError::InvoiceNotFound(invoice_id))?;

        if caller_id != invoice.contractor_id && caller_id != invoice.business_id {
            return Err(ServiceError::Forbidden(caller_id, invoice_id));
        }

        let line_items = self.store.get_invoice_line_items(invoice_id).await?;
        Ok(InvoiceWithItems { invoice, line_items })
    }

    pub async fn update_status(
        &self,
        invoice_id: Uuid,
        caller_id: Uuid,
        to: InvoiceStatus,
    ) -> Result<Invoice, ServiceError> {
        let invoice = self
            .store
            .get_invoice(invoice_id)
            .await?
            .ok_or(ServiceError::InvoiceNotFound(invoice_id))?;

        let allowed_actor = match to {
            InvoiceStatus::Paid => invoice.business_id,
            _ => invoice.contractor_id,
        };
        if caller_id != allowed_actor {
            return Err(ServiceError::Forbidden(caller_id, invoice_id));
        }
        if !invoice.status.can_transition_to(to) {
            return Err(ServiceError::InvalidState(format!(
                "invoice {} cannot move from {} to {}",
                invoice_id,
                invoice.status.to_str(),
                to.to_str()
            )));
        }

        let updated = self
            .store
            .update_invoice_status(invoice_id, invoice.status, to)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(format!(
                    "invoice {} was modified concurrently",
                    invoice_id
                ))
            })?;

        tracing::info!(invoice_id = %invoice_id, status = updated.status.to_str(), "invoice status updated");
        self.notification_service.notify_invoice_status(&updated).await;

        Ok(updated)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, ServiceError> {
        Ok(self.store.list_invoices_for_user(user_id).await?)
    }
}
