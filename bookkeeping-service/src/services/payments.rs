//! Payment service and the invoice reconciliation engine.

use crate::models::{
    CreateJournalEntry, CreatePayment, ExpenseEvent, Invoice, JournalLineInput, Payment,
    PaymentDirection, PaymentMethod, Reconciliation, StateChangeEvent, UpdatePayment, CODE_BANK,
    CODE_CASH, CODE_EXPENSE, CODE_RECEIVABLE,
};
use crate::services::database::Database;
use crate::services::expenses::ExpenseWorkflow;
use crate::services::metrics::RECONCILIATIONS_TOTAL;
use crate::services::outbox::{self, Dispatcher};
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use service_core::identity::AuthenticatedIdentity;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const SELECT_PAYMENT: &str = r#"
SELECT payment_id, amount, paid_at, direction, method, label, invoice_id,
       expense_request_id, overpaid_amount, note, created_by, created_utc
FROM payments
"#;

/// Creates and maintains payments; recomputes invoice status whenever a
/// payment touching an invoice changes.
#[derive(Clone)]
pub struct Payments {
    db: Database,
    dispatcher: Dispatcher,
    workflow: ExpenseWorkflow,
}

impl Payments {
    pub fn new(db: Database, dispatcher: Dispatcher, workflow: ExpenseWorkflow) -> Self {
        Self {
            db,
            dispatcher,
            workflow,
        }
    }

    /// Create a payment, then run its side effects in order: invoice
    /// reconciliation, the expense Pay transition, and the automatic journal
    /// posting. The payment row itself is the primary write; a failed Pay
    /// transition or journal posting is logged and does not undo it.
    #[instrument(skip(self, input, identity), fields(created_by = %identity.username))]
    pub async fn create_payment(
        &self,
        input: &CreatePayment,
        identity: &AuthenticatedIdentity,
    ) -> Result<Payment, AppError> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment amount must be positive"
            )));
        }
        if input.invoice_id.is_some() && input.expense_request_id.is_some() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "A payment settles an invoice or an expense request, not both"
            )));
        }

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments
                (payment_id, amount, paid_at, direction, method, invoice_id, expense_request_id, note, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING payment_id, amount, paid_at, direction, method, label, invoice_id,
                      expense_request_id, overpaid_amount, note, created_by, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.amount)
        .bind(input.paid_at.unwrap_or_else(Utc::now))
        .bind(input.direction.as_str())
        .bind(input.method.as_str())
        .bind(input.invoice_id)
        .bind(input.expense_request_id)
        .bind(&input.note)
        .bind(&identity.username)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!(
                    "Referenced invoice or expense request does not exist"
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create payment: {}", e)),
        })?;

        info!(payment_id = %payment.payment_id, "Payment created");

        if let Some(invoice_id) = input.invoice_id {
            self.reconcile_invoice(invoice_id).await?;
        }

        if let Some(expense_id) = input.expense_request_id {
            // Deliberate decoupling: the payment stands even if the expense
            // cannot transition. The failure is logged and visible on the
            // expense, which stays in its previous state.
            if let Err(e) = self
                .workflow
                .transition(expense_id, ExpenseEvent::Pay, Some(payment.payment_id), identity)
                .await
            {
                warn!(
                    payment_id = %payment.payment_id,
                    expense_id = %expense_id,
                    "Payment created but expense Pay transition failed: {}",
                    e
                );
            }
        }

        self.post_payment_journal(&payment, identity).await;

        // Reconciliation may have rewritten the label on this payment.
        self.get_payment(payment.payment_id)
            .await?
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Payment vanished after create")))
    }

    /// Update a payment. Every invoice whose linkage is affected, old or
    /// new, is re-reconciled.
    #[instrument(skip(self, patch))]
    pub async fn update_payment(
        &self,
        payment_id: Uuid,
        patch: &UpdatePayment,
    ) -> Result<Payment, AppError> {
        if let Some(amount) = patch.amount {
            if amount <= Decimal::ZERO {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Payment amount must be positive"
                )));
            }
        }

        let existing = self
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment {} not found", payment_id)))?;

        let new_invoice_id = match &patch.invoice_id {
            Some(linkage) => *linkage,
            None => existing.invoice_id,
        };

        if existing.expense_request_id.is_some() && new_invoice_id.is_some() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "A payment settles an invoice or an expense request, not both"
            )));
        }

        let updated = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET amount = COALESCE($2, amount),
                paid_at = COALESCE($3, paid_at),
                method = COALESCE($4, method),
                invoice_id = $5,
                note = COALESCE($6, note)
            WHERE payment_id = $1
            RETURNING payment_id, amount, paid_at, direction, method, label, invoice_id,
                      expense_request_id, overpaid_amount, note, created_by, created_utc
            "#,
        )
        .bind(payment_id)
        .bind(patch.amount)
        .bind(patch.paid_at)
        .bind(patch.method.map(|m| m.as_str()))
        .bind(new_invoice_id)
        .bind(&patch.note)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Referenced invoice does not exist"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to update payment: {}", e)),
        })?;

        if let Some(old_invoice) = existing.invoice_id {
            self.reconcile_invoice(old_invoice).await?;
        }
        if let Some(new_invoice) = new_invoice_id {
            if existing.invoice_id != Some(new_invoice) {
                self.reconcile_invoice(new_invoice).await?;
            }
        }

        // Reconciliation may have relabeled the row just updated.
        self.get_payment(updated.payment_id)
            .await?
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Payment vanished after update")))
    }

    /// Remove a payment and re-reconcile the formerly linked invoice.
    #[instrument(skip(self))]
    pub async fn remove_payment(&self, payment_id: Uuid) -> Result<(), AppError> {
        let existing = self
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment {} not found", payment_id)))?;

        sqlx::query("DELETE FROM payments WHERE payment_id = $1")
            .bind(payment_id)
            .execute(self.db.pool())
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete payment: {}", e))
            })?;

        info!(payment_id = %payment_id, "Payment removed");

        if let Some(invoice_id) = existing.invoice_id {
            self.reconcile_invoice(invoice_id).await?;
        }

        Ok(())
    }

    /// Get a payment by ID.
    pub async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        let payment =
            sqlx::query_as::<_, Payment>(&format!("{} WHERE payment_id = $1", SELECT_PAYMENT))
                .bind(payment_id)
                .fetch_optional(self.db.pool())
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e))
                })?;

        Ok(payment)
    }

    /// List payments, newest first.
    pub async fn list_payments(&self) -> Result<Vec<Payment>, AppError> {
        let payments =
            sqlx::query_as::<_, Payment>(&format!("{} ORDER BY created_utc DESC", SELECT_PAYMENT))
                .fetch_all(self.db.pool())
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e))
                })?;

        Ok(payments)
    }

    /// Recompute an invoice's payment status from the decimal-exact sum of
    /// its linked payments.
    ///
    /// The invoice status update and the payment relabeling commit in one
    /// transaction; the cumulative outcome is attributed to the most recently
    /// created payment. The status-change webhook fires after commit.
    #[instrument(skip(self))]
    pub async fn reconcile_invoice(&self, invoice_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.db.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, invoice_no, partner_name, amount, status, pdf_key, due_date, created_by, created_utc
            FROM invoices
            WHERE invoice_id = $1
            FOR UPDATE
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load invoice: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id)))?;

        let paid_sum: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sum payments: {}", e)))?;

        let outcome = Reconciliation::compute(invoice.amount, paid_sum);

        sqlx::query("UPDATE invoices SET status = $2 WHERE invoice_id = $1")
            .bind(invoice_id)
            .bind(outcome.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice status: {}", e))
            })?;

        // The cumulative outcome lives on the latest payment only; older
        // payments drop back to normal.
        sqlx::query(
            "UPDATE payments SET label = 'normal', overpaid_amount = NULL WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to reset labels: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE payments
            SET label = $2, overpaid_amount = $3
            WHERE payment_id = (
                SELECT payment_id FROM payments
                WHERE invoice_id = $1
                ORDER BY created_utc DESC, payment_id DESC
                LIMIT 1
            )
            "#,
        )
        .bind(invoice_id)
        .bind(outcome.label.as_str())
        .bind(outcome.overpaid_amount)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to label latest payment: {}", e))
        })?;

        let status_changed = invoice.status != outcome.status.as_str();
        if status_changed {
            let event = StateChangeEvent::invoice(
                invoice_id,
                &invoice.status,
                outcome.status.as_str(),
            );
            outbox::record(&mut tx, &event).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit reconciliation: {}", e))
        })?;

        RECONCILIATIONS_TOTAL
            .with_label_values(&[outcome.status.as_str()])
            .inc();

        info!(
            invoice_id = %invoice_id,
            paid_sum = %paid_sum,
            status = %outcome.status,
            "Invoice reconciled"
        );

        if status_changed {
            self.dispatcher.dispatch_pending().await;
        }

        Ok(())
    }

    /// Post the automatic double-entry record for a payment. Missing
    /// bootstrap accounts degrade gracefully: the posting is skipped with an
    /// error log and the payment stands.
    async fn post_payment_journal(&self, payment: &Payment, identity: &AuthenticatedIdentity) {
        let result = self.try_post_payment_journal(payment, identity).await;
        if let Err(e) = result {
            warn!(
                payment_id = %payment.payment_id,
                "Journal posting for payment skipped: {}",
                e
            );
        }
    }

    async fn try_post_payment_journal(
        &self,
        payment: &Payment,
        identity: &AuthenticatedIdentity,
    ) -> Result<(), AppError> {
        let settlement_code = match payment.parsed_method() {
            Some(PaymentMethod::Bank) => CODE_BANK,
            Some(PaymentMethod::Cash) | Some(PaymentMethod::Other) => CODE_CASH,
            None => CODE_CASH,
        };

        let settlement = self.require_account(settlement_code).await?;

        let (debit_account, credit_account) = match payment.parsed_direction() {
            Some(PaymentDirection::In) => {
                let receivable = self.require_account(CODE_RECEIVABLE).await?;
                (settlement, receivable)
            }
            Some(PaymentDirection::Out) | None => {
                let expense = self.require_account(CODE_EXPENSE).await?;
                (expense, settlement)
            }
        };

        let entry = CreateJournalEntry {
            entry_datetime: Some(payment.paid_at),
            description: Some(format!("Payment {}", payment.payment_id)),
            lines: vec![
                JournalLineInput {
                    account_id: debit_account,
                    debit: Some(payment.amount),
                    credit: None,
                },
                JournalLineInput {
                    account_id: credit_account,
                    debit: None,
                    credit: Some(payment.amount),
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
