// db/invoicedb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::{DBClient, StoreError};
use crate::models::invoicemodel::*;

#[async_trait]
pub trait InvoiceExt: Send + Sync {
    /// Writes the header and every line item, or nothing.
    async fn insert_invoice(
        &self,
        header: &NewInvoice,
        line_items: &[NewLineItem],
    ) -> Result<InvoiceWithItems, StoreError>;

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, StoreError>;

    /// Ordered by position.
    async fn get_invoice_line_items(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceLineItem>, StoreError>;

    /// Compare-and-set on status. `None` if the invoice was not in `from`.
    async fn update_invoice_status(
        &self,
        invoice_id: Uuid,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> Result<Option<Invoice>, StoreError>;

    async fn list_invoices_for_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, StoreError>;
}

#[async_trait]
impl InvoiceExt for DBClient {
    async fn insert_invoice(
        &self,
        header: &NewInvoice,
        line_items: &[NewLineItem],
    ) -> Result<InvoiceWithItems, StoreError> {
        let mut tx = self.pool.begin().await?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices
            (contractor_id, business_id, job_id, status, total_amount, notes)
            VALUES ($1, $2, $3, 'draft'::invoice_status, $4, $5)
            RETURNING id, contractor_id, business_id, job_id, status, total_amount,
            notes, created_at, updated_at
            "#
        )
        .bind(header.contractor_id)
        .bind(header.business_id)
        .bind(header.job_id)
        .bind(&header.total_amount)
        .bind(&header.notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(line_items.len());
        for (position, item) in line_items.iter().enumerate() {
            let row = sqlx::query_as::<_, InvoiceLineItem>(
                r#"
                INSERT INTO invoice_line_items
                (invoice_id, position, description, quantity, rate, amount)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, invoice_id, position, description, quantity, rate, amount
                "#
            )
            .bind(invoice.id)
            .bind(position as i32)
            .bind(&item.description)
            .bind(&item.quantity)
            .bind(&item.rate)
            .bind(&item.amount)
            .fetch_one(&mut *tx)
            .await?;
            items.push(row);
        }

        tx.commit().await?;
        Ok(InvoiceWithItems { invoice, line_items: items })
    }

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, StoreError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, contractor_id, business_id, job_id, status, total_amount,
            notes, created_at, updated_at
            FROM invoices
            WHERE id = $1
            "#
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    async fn get_invoice_line_items(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceLineItem>, StoreError> {
        let items = sqlx::query_as::<_, InvoiceLineItem>(
            r#"
            SELECT id, invoice_id, position, description, quantity, rate, amount
            FROM invoice_line_items
            WHERE invoice_id = $1
            ORDER BY position ASC
            "#
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn update_invoice_status(
        &self,
        invoice_id: Uuid,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> Result<Option<Invoice>, StoreError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING id, contractor_id, business_id, job_id, status, total_amount,
            notes, created_at, updated_at
            "#
        )
        .bind(invoice_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    async fn list_invoices_for_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, StoreError> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, contractor_id, business_id, job_id, status, total_amount,
            notes, created_at, updated_at
            FROM invoices
            WHERE contractor_id = $1 OR business_id = $1
            ORDER BY created_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }
}
