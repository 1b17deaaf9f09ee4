//! Mutation root.
//!
//! Every mutation requires a caller identity; the HTTP handler injects it
//! into the request data before execution. Approve/reject authorization is
//! enforced inside the workflow service, not here.

use async_graphql::{Context, Object, Result};
use service_core::error::AppError;
use uuid::Uuid;

use crate::graphql::types::*;
use crate::graphql::{graphql_error, identity, GqlResultExt};
use crate::models::ExpenseEvent;
use crate::startup::Services;

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    // -- reference data -----------------------------------------------------

    async fn create_account(
        &self,
        ctx: &Context<'_>,
        input: CreateAccountInput,
    ) -> Result<AccountObject> {
        let services = ctx.data_unchecked::<Services>();
        identity(ctx)?;
        let account = services.db.create_account(&input.into()).await.ext_err()?;
        Ok(account.into())
    }

    async fn create_category(
        &self,
        ctx: &Context<'_>,
        input: CreateCategoryInput,
    ) -> Result<CategoryObject> {
        let services = ctx.data_unchecked::<Services>();
        identity(ctx)?;
        let category = services.db.create_category(&input.into()).await.ext_err()?;
        Ok(category.into())
    }

    async fn update_category(
        &self,
        ctx: &Context<'_>,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<CategoryObject> {
        let services = ctx.data_unchecked::<Services>();
        identity(ctx)?;
        let category = services
            .db
            .update_category(category_id, &input.into())
            .await
            .ext_err()?;
        Ok(category.into())
    }

    /// Fails with `CATEGORY_IN_USE` while any budget or expense request
    /// references the category.
    async fn delete_category(&self, ctx: &Context<'_>, category_id: Uuid) -> Result<bool> {
        let services = ctx.data_unchecked::<Services>();
        identity(ctx)?;
        services.db.delete_category(category_id).await.ext_err()?;
        Ok(true)
    }

    /// Upsert the budget for `(categoryId, fiscalYear)`.
    async fn set_budget(&self, ctx: &Context<'_>, input: SetBudgetInput) -> Result<BudgetObject> {
        let services = ctx.data_unchecked::<Services>();
        identity(ctx)?;
        let budget = services.db.set_budget(&input.into()).await.ext_err()?;
        Ok(budget.into())
    }

    /// Register attachment metadata and return a presigned upload URL for
    /// the bytes.
    async fn register_attachment(
        &self,
        ctx: &Context<'_>,
        input: RegisterAttachmentInput,
    ) -> Result<AttachmentRegistration> {
        let services = ctx.data_unchecked::<Services>();
        let identity = identity(ctx)?;

        let storage_key = format!("attachments/{}/{}", Uuid::new_v4(), input.file_name);
        let attachment = services
            .db
            .create_attachment(&input.into(), &storage_key, &identity.username)
            .await
            .ext_err()?;
        let upload_url = services
            .storage
            .presigned_put(&storage_key, services.presign_ttl)
            .await
            .ext_err()?;

        Ok(AttachmentRegistration {
            attachment: attachment.into(),
            upload_url,
        })
    }

    // -- journal ------------------------------------------------------------

    /// Rejected with `DEBIT_CREDIT_MISMATCH` unless debits equal credits
    /// exactly.
    async fn create_journal_entry(
        &self,
        ctx: &Context<'_>,
        input: CreateJournalEntryInput,
    ) -> Result<JournalEntryObject> {
        let services = ctx.data_unchecked::<Services>();
        let identity = identity(ctx)?;
        let entry = services
            .db
            .create_journal_entry(&input.into(), &identity.username)
            .await
            .ext_err()?;
        Ok(entry.into())
    }

    async fn update_journal_entry(
        &self,
        ctx: &Context<'_>,
        entry_id: Uuid,
        input: UpdateJournalEntryInput,
    ) -> Result<JournalEntryObject> {
        let services = ctx.data_unchecked::<Services>();
        identity(ctx)?;
        let entry = services
            .db
            .update_journal_entry(entry_id, &input.into())
            .await
            .ext_err()?;
        Ok(entry.into())
    }

    async fn delete_journal_entry(&self, ctx: &Context<'_>, entry_id: Uuid) -> Result<bool> {
        let services = ctx.data_unchecked::<Services>();
        identity(ctx)?;
        services.db.delete_journal_entry(entry_id).await.ext_err()?;
        Ok(true)
    }

    // -- invoices -----------------------------------------------------------

    async fn create_invoice(
        &self,
        ctx: &Context<'_>,
        input: CreateInvoiceInput,
    ) -> Result<InvoiceObject> {
        let services = ctx.data_unchecked::<Services>();
        let identity = identity(ctx)?;
        let invoice = services
            .invoicing
            .create_invoice(&input.into(), identity)
            .await
            .ext_err()?;
        Ok(invoice.into())
    }

    // -- expense workflow ---------------------------------------------------

    async fn create_expense_request(
        &self,
        ctx: &Context<'_>,
        input: CreateExpenseRequestInput,
    ) -> Result<ExpenseRequestObject> {
        let services = ctx.data_unchecked::<Services>();
        let identity = identity(ctx)?;
        let expense = services
            .workflow
            .create(&input.into(), identity)
            .await
            .ext_err()?;
        Ok(expense.into())
    }

    /// Amend a Draft request.
    async fn update_expense_request(
        &self,
        ctx: &Context<'_>,
        expense_id: Uuid,
        input: UpdateExpenseRequestInput,
    ) -> Result<ExpenseRequestObject> {
        let services = ctx.data_unchecked::<Services>();
        identity(ctx)?;
        let expense = services
            .workflow
            .update(expense_id, &input.into())
            .await
            .ext_err()?;
        Ok(expense.into())
    }

    async fn submit_expense_request(
        &self,
        ctx: &Context<'_>,
        expense_id: Uuid,
    ) -> Result<ExpenseRequestObject> {
        self.transition(ctx, expense_id, ExpenseEvent::Submit, None)
            .await
    }

    /// Admin only.
    async fn approve_expense_request(
        &self,
        ctx: &Context<'_>,
        expense_id: Uuid,
    ) -> Result<ExpenseRequestObject> {
        self.transition(ctx, expense_id, ExpenseEvent::Approve, None)
            .await
    }

    /// Admin only.
    async fn reject_expense_request(
        &self,
        ctx: &Context<'_>,
        expense_id: Uuid,
    ) -> Result<ExpenseRequestObject> {
        self.transition(ctx, expense_id, ExpenseEvent::Reject, None)
            .await
    }

    /// Link the settling payment and move Approved -> Paid.
    async fn pay_expense_request(
        &self,
        ctx: &Context<'_>,
        expense_id: Uuid,
        payment_id: Uuid,
    ) -> Result<ExpenseRequestObject> {
        self.transition(ctx, expense_id, ExpenseEvent::Pay, Some(payment_id))
            .await
    }

    async fn close_expense_request(
        &self,
        ctx: &Context<'_>,
        expense_id: Uuid,
    ) -> Result<ExpenseRequestObject> {
        self.transition(ctx, expense_id, ExpenseEvent::Close, None)
            .await
    }

    /// Reopen a Rejected request for editing (back to Draft).
    async fn edit_expense_request(
        &self,
        ctx: &Context<'_>,
        expense_id: Uuid,
    ) -> Result<ExpenseRequestObject> {
        self.transition(ctx, expense_id, ExpenseEvent::Edit, None)
            .await
    }

    // -- payments -----------------------------------------------------------

    async fn create_payment(
        &self,
        ctx: &Context<'_>,
        input: CreatePaymentInput,
    ) -> Result<PaymentObject> {
        let services = ctx.data_unchecked::<Services>();
        let identity = identity(ctx)?;
        let payment = services
            .payments
            .create_payment(&input.into(), identity)
            .await
            .ext_err()?;
        Ok(payment.into())
    }

    async fn update_payment(
        &self,
        ctx: &Context<'_>,
        payment_id: Uuid,
        input: UpdatePaymentInput,
    ) -> Result<PaymentObject> {
        let services = ctx.data_unchecked::<Services>();
        identity(ctx)?;
        let patch = input
            .into_patch()
            .map_err(|msg| graphql_error(AppError::BadRequest(anyhow::anyhow!(msg))))?;
        let payment = services
            .payments
            .update_payment(payment_id, &patch)
            .await
            .ext_err()?;
        Ok(payment.into())
    }

    async fn delete_payment(&self, ctx: &Context<'_>, payment_id: Uuid) -> Result<bool> {
        let services = ctx.data_unchecked::<Services>();
        identity(ctx)?;
        services.payments.remove_payment(payment_id).await.ext_err()?;
        Ok(true)
    }
}

impl MutationRoot {
    async fn transition(
        &self,
        ctx: &Context<'_>,
        expense_id: Uuid,
        event: ExpenseEvent,
        payment_id: Option<Uuid>,
    ) -> Result<ExpenseRequestObject> {
        let services = ctx.data_unchecked::<Services>();
        let identity = identity(ctx)?;
        let expense = services
            .workflow
            .transition(expense_id, event, payment_id, identity)
            .await
            .ext_err()?;
        Ok(expense.into())
    }
}
