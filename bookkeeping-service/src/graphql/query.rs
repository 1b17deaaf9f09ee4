//! Query root.

use async_graphql::{Context, Object, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::graphql::types::*;
use crate::graphql::{identity, GqlResultExt};
use crate::models::JournalRange;
use crate::startup::Services;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The caller behind the trusted proxy header.
    async fn me(&self, ctx: &Context<'_>) -> Result<CallerObject> {
        Ok(identity(ctx)?.into())
    }

    /// Ledger accounts, optionally filtered by category.
    async fn accounts(
        &self,
        ctx: &Context<'_>,
        category: Option<AccountCategoryGql>,
    ) -> Result<Vec<AccountObject>> {
        let services = ctx.data_unchecked::<Services>();
        let accounts = services
            .db
            .list_accounts(category.map(Into::into))
            .await
            .ext_err()?;
        Ok(accounts.into_iter().map(Into::into).collect())
    }

    async fn account(&self, ctx: &Context<'_>, account_id: Uuid) -> Result<Option<AccountObject>> {
        let services = ctx.data_unchecked::<Services>();
        Ok(services
            .db
            .get_account(account_id)
            .await
            .ext_err()?
            .map(Into::into))
    }

    async fn categories(&self, ctx: &Context<'_>) -> Result<Vec<CategoryObject>> {
        let services = ctx.data_unchecked::<Services>();
        let categories = services.db.list_categories().await.ext_err()?;
        Ok(categories.into_iter().map(Into::into).collect())
    }

    /// Budgets, optionally restricted to one fiscal year.
    async fn budgets(
        &self,
        ctx: &Context<'_>,
        fiscal_year: Option<i32>,
    ) -> Result<Vec<BudgetObject>> {
        let services = ctx.data_unchecked::<Services>();
        let budgets = services.db.list_budgets(fiscal_year).await.ext_err()?;
        Ok(budgets.into_iter().map(Into::into).collect())
    }

    async fn attachment(
        &self,
        ctx: &Context<'_>,
        attachment_id: Uuid,
    ) -> Result<Option<AttachmentObject>> {
        let services = ctx.data_unchecked::<Services>();
        Ok(services
            .db
            .get_attachment(attachment_id)
            .await
            .ext_err()?
            .map(Into::into))
    }

    /// Presigned download URL for an attachment's bytes.
    async fn attachment_url(&self, ctx: &Context<'_>, attachment_id: Uuid) -> Result<String> {
        let services = ctx.data_unchecked::<Services>();
        let attachment = services
            .db
            .get_attachment(attachment_id)
            .await
            .ext_err()?
            .ok_or_else(|| {
                crate::graphql::graphql_error(service_core::error::AppError::NotFound(
                    anyhow::anyhow!("Attachment {} not found", attachment_id),
                ))
            })?;
        services
            .storage
            .presigned_get(&attachment.storage_key, services.presign_ttl)
            .await
            .ext_err()
    }

    async fn journal_entry(
        &self,
        ctx: &Context<'_>,
        entry_id: Uuid,
    ) -> Result<Option<JournalEntryObject>> {
        let services = ctx.data_unchecked::<Services>();
        Ok(services
            .db
            .get_journal_entry(entry_id)
            .await
            .ext_err()?
            .map(Into::into))
    }

    /// Journal entries in a datetime range, newest first. `search` matches
    /// the description, case-insensitively.
    async fn journal_entries(
        &self,
        ctx: &Context<'_>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        search: Option<String>,
    ) -> Result<Vec<JournalEntryObject>> {
        let services = ctx.data_unchecked::<Services>();
        let range = JournalRange { from, to, search };
        let entries = services.db.find_journal_entries(&range).await.ext_err()?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    async fn invoices(&self, ctx: &Context<'_>) -> Result<Vec<InvoiceObject>> {
        let services = ctx.data_unchecked::<Services>();
        let invoices = services.invoicing.list_invoices().await.ext_err()?;
        Ok(invoices.into_iter().map(Into::into).collect())
    }

    async fn invoice(&self, ctx: &Context<'_>, invoice_id: Uuid) -> Result<Option<InvoiceObject>> {
        let services = ctx.data_unchecked::<Services>();
        Ok(services
            .invoicing
            .get_invoice(invoice_id)
            .await
            .ext_err()?
            .map(Into::into))
    }

    /// Presigned download URL for the invoice PDF.
    async fn invoice_pdf_url(&self, ctx: &Context<'_>, invoice_id: Uuid) -> Result<String> {
        let services = ctx.data_unchecked::<Services>();
        services.invoicing.invoice_pdf_url(invoice_id).await.ext_err()
    }

    async fn expense_requests(
        &self,
        ctx: &Context<'_>,
        state: Option<ExpenseStateGql>,
    ) -> Result<Vec<ExpenseRequestObject>> {
        let services = ctx.data_unchecked::<Services>();
        let expenses = services
            .workflow
            .list(state.map(Into::into))
            .await
            .ext_err()?;
        Ok(expenses.into_iter().map(Into::into).collect())
    }

    async fn expense_request(
        &self,
        ctx: &Context<'_>,
        expense_id: Uuid,
    ) -> Result<Option<ExpenseRequestObject>> {
        let services = ctx.data_unchecked::<Services>();
        Ok(services
            .workflow
            .get(expense_id)
            .await
            .ext_err()?
            .map(Into::into))
    }

    async fn payments(&self, ctx: &Context<'_>) -> Result<Vec<PaymentObject>> {
        let services = ctx.data_unchecked::<Services>();
        let payments = services.payments.list_payments().await.ext_err()?;
        Ok(payments.into_iter().map(Into::into).collect())
    }

    async fn payment(&self, ctx: &Context<'_>, payment_id: Uuid) -> Result<Option<PaymentObject>> {
        let services = ctx.data_unchecked::<Services>();
        Ok(services
            .payments
            .get_payment(payment_id)
            .await
            .ext_err()?
            .map(Into::into))
    }

    /// Profit and loss statement over `[from, to)`.
    async fn profit_loss(
        &self,
        ctx: &Context<'_>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ProfitLossObject> {
        let services = ctx.data_unchecked::<Services>();
        let statement = services.db.profit_loss(from, to).await.ext_err()?;
        Ok(statement.into())
    }
}
