//! Invoice issuance.

use crate::models::{
    next_invoice_no, CreateInvoice, CreateJournalEntry, Invoice, InvoiceStatus, JournalLineInput,
    CODE_RECEIVABLE, CODE_REVENUE,
};
use crate::services::database::Database;
use crate::services::pdf::PdfRenderer;
use crate::services::storage::Storage;
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use service_core::error::AppError;
use service_core::identity::AuthenticatedIdentity;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const SELECT_INVOICE: &str = r#"
SELECT invoice_id, invoice_no, partner_name, amount, status, pdf_key, due_date, created_by, created_utc
FROM invoices
"#;

const INVOICE_TEMPLATE: &str = "invoice.html";

/// Issues invoices: numbering, PDF rendering, storage upload, persistence,
/// and the automatic receivable/revenue journal posting.
#[derive(Clone)]
pub struct Invoicing {
    db: Database,
    storage: Arc<dyn Storage>,
    pdf: Arc<dyn PdfRenderer>,
    presign_ttl: Duration,
}

impl Invoicing {
    pub fn new(
        db: Database,
        storage: Arc<dyn Storage>,
        pdf: Arc<dyn PdfRenderer>,
        presign_ttl: Duration,
    ) -> Self {
        Self {
            db,
            storage,
            pdf,
            presign_ttl,
        }
    }

    /// Create an invoice.
    ///
    /// PDF rendering and storage upload run before the row is inserted, so a
    /// rendering or upload failure aborts creation with no partial invoice.
    /// The journal posting runs after the insert; its failure is logged and
    /// the invoice stands (issuance is prioritized over bookkeeping
    /// completeness).
    #[instrument(skip(self, input, identity), fields(partner = %input.partner_name))]
    pub async fn create_invoice(
        &self,
        input: &CreateInvoice,
        identity: &AuthenticatedIdentity,
    ) -> Result<Invoice, AppError> {
        input.validate()?;
        if input.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoice amount must be positive"
            )));
        }
        let today = Utc::now().date_naive();
        if input.due_date < today {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Due date must not be in the past"
            )));
        }

        let invoice_no = self.next_number().await?;
        let pdf_key = format!("invoices/{}.pdf", invoice_no);

        let pdf_bytes = self
            .pdf
            .render(
                INVOICE_TEMPLATE,
                &json!({
                    "invoiceNo": invoice_no,
                    "partnerName": input.partner_name,
                    "amount": input.amount.to_string(),
                    "dueDate": input.due_date.to_string(),
                    "issuedBy": identity.username,
                }),
            )
            .await?;

        self.storage.upload(&pdf_key, pdf_bytes).await?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (invoice_id, invoice_no, partner_name, amount, status, pdf_key, due_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING invoice_id, invoice_no, partner_name, amount, status, pdf_key, due_date, created_by, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&invoice_no)
        .bind(&input.partner_name)
        .bind(input.amount)
        .bind(InvoiceStatus::Unpaid.as_str())
        .bind(&pdf_key)
        .bind(input.due_date)
        .bind(&identity.username)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                // Two concurrent creations drew the same sequence; the loser
                // retries from the client side.
                AppError::Conflict(anyhow::anyhow!(
                    "Invoice number {} was taken concurrently",
                    invoice_no
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)),
        })?;

        info!(invoice_id = %invoice.invoice_id, invoice_no = %invoice.invoice_no, "Invoice created");

        if let Err(e) = self.post_issuance_journal(&invoice, identity).await {
            warn!(
                invoice_id = %invoice.invoice_id,
                "Journal posting for invoice skipped: {}",
                e
            );
        }

        Ok(invoice)
    }

    /// Get an invoice by ID.
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let invoice =
            sqlx::query_as::<_, Invoice>(&format!("{} WHERE invoice_id = $1", SELECT_INVOICE))
                .bind(invoice_id)
                .fetch_optional(self.db.pool())
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e))
                })?;

        Ok(invoice)
    }

    /// List invoices, newest number first.
    pub async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let invoices =
            sqlx::query_as::<_, Invoice>(&format!("{} ORDER BY invoice_no DESC", SELECT_INVOICE))
                .fetch_all(self.db.pool())
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e))
                })?;

        Ok(invoices)
    }

    /// Presigned download URL for the invoice PDF.
    pub async fn invoice_pdf_url(&self, invoice_id: Uuid) -> Result<String, AppError> {
        let invoice = self
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id)))?;

        self.storage
            .presigned_get(&invoice.pdf_key, self.presign_ttl)
            .await
    }

    /// Next number in the per-calendar-year sequence. The lexicographic
    /// `DESC` scan is correct because sequences are zero-padded to 4 digits.
    async fn next_number(&self) -> Result<String, AppError> {
        let now = Utc::now();
        let prefix = crate::models::invoice_no_prefix(now.year());

        let highest: Option<String> = sqlx::query_scalar(
            "SELECT invoice_no FROM invoices WHERE invoice_no LIKE $1 || '%' ORDER BY invoice_no DESC LIMIT 1",
        )
        .bind(prefix)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to scan invoice numbers: {}", e))
        })?;

        Ok(next_invoice_no(now, highest.as_deref()))
    }

    async fn post_issuance_journal(
        &self,
        invoice: &Invoice,
        identity: &AuthenticatedIdentity,
    ) -> Result<(), AppError> {
        let receivable = self.require_account(CODE_RECEIVABLE).await?;
        let revenue = self.require_account(CODE_REVENUE).await?;

        let entry = CreateJournalEntry {
            entry_datetime: Some(invoice.created_utc),
            description: Some(format!("Invoice {}", invoice.invoice_no)),
            lines: vec![
                JournalLineInput {
                    account_id: receivable,
                    debit: Some(invoice.amount),
                    credit: None,
                },
                JournalLineInput {
                    account_id: revenue,
                    debit: None,
                    credit: Some(invoice.amount),
                },
            ],
        };

        self.db
            .create_journal_entry(&entry, &identity.username)
            .await?;

        Ok(())
    }

    async fn require_account(&self, code: &str) -> Result<Uuid, AppError> {
        self.db
            .get_account_by_code(code)
            .await?
            .map(|a| a.account_id)
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("Bootstrap account {} is missing", code))
            })
    }
}
