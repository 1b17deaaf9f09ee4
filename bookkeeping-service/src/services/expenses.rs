//! Expense approval workflow service.

use crate::models::{
    CreateExpenseRequest, ExpenseEvent, ExpenseRequest, ExpenseState, StateChangeEvent,
    UpdateExpenseRequest,
};
use crate::services::database::Database;
use crate::services::metrics::EXPENSE_TRANSITIONS_TOTAL;
use crate::services::outbox::{self, Dispatcher};
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use service_core::identity::AuthenticatedIdentity;
use tracing::{info, instrument};
use uuid::Uuid;

const SELECT_EXPENSE: &str = r#"
SELECT expense_id, amount, state, description, requester, approver, approved_at,
       attachment_id, account_id, category_id, payment_id, created_utc, updated_utc
FROM expense_requests
"#;

/// Drives the expense request lifecycle. All state changes go through
/// [`transition`](ExpenseWorkflow::transition); the row is locked for the
/// duration of the read-modify-write.
#[derive(Clone)]
pub struct ExpenseWorkflow {
    db: Database,
    dispatcher: Dispatcher,
}

impl ExpenseWorkflow {
    pub fn new(db: Database, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    /// Create a request in Draft. The receipt attachment is mandatory and
    /// must already be registered.
    #[instrument(skip(self, input, identity), fields(requester = %identity.username))]
    pub async fn create(
        &self,
        input: &CreateExpenseRequest,
        identity: &AuthenticatedIdentity,
    ) -> Result<ExpenseRequest, AppError> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Expense amount must be positive"
            )));
        }

        if self.db.get_attachment(input.attachment_id).await?.is_none() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Receipt attachment {} does not exist",
                input.attachment_id
            )));
        }

        let expense = sqlx::query_as::<_, ExpenseRequest>(
            r#"
            INSERT INTO expense_requests
                (expense_id, amount, state, description, requester, attachment_id, account_id, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING expense_id, amount, state, description, requester, approver, approved_at,
                      attachment_id, account_id, category_id, payment_id, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.amount)
        .bind(ExpenseState::Draft.as_str())
        .bind(&input.description)
        .bind(&identity.username)
        .bind(input.attachment_id)
        .bind(input.account_id)
        .bind(input.category_id)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Referenced account or category does not exist"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create expense request: {}", e)),
        })?;

        info!(expense_id = %expense.expense_id, "Expense request created");

        Ok(expense)
    }

    /// Amend a Draft request. Other states reject the edit; Rejected must
    /// first loop back to Draft via the Edit event.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        expense_id: Uuid,
        patch: &UpdateExpenseRequest,
    ) -> Result<ExpenseRequest, AppError> {
        if let Some(amount) = patch.amount {
            if amount <= Decimal::ZERO {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Expense amount must be positive"
                )));
            }
        }

        let expense = sqlx::query_as::<_, ExpenseRequest>(
            r#"
            UPDATE expense_requests
            SET amount = COALESCE($2, amount),
                description = COALESCE($3, description),
                attachment_id = COALESCE($4, attachment_id),
                account_id = COALESCE($5, account_id),
                category_id = COALESCE($6, category_id),
                updated_utc = NOW()
            WHERE expense_id = $1 AND state = 'draft'
            RETURNING expense_id, amount, state, description, requester, approver, approved_at,
                      attachment_id, account_id, category_id, payment_id, created_utc, updated_utc
            "#,
        )
        .bind(expense_id)
        .bind(patch.amount)
        .bind(&patch.description)
        .bind(patch.attachment_id)
        .bind(patch.account_id)
        .bind(patch.category_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!(
                    "Referenced attachment, account or category does not exist"
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to update expense request: {}", e)),
        })?;

        match expense {
            Some(expense) => Ok(expense),
            // Distinguish missing row from wrong state for the caller.
            None => match self.get(expense_id).await? {
                Some(_) => Err(AppError::BusinessRule(
                    "INVALID_TRANSITION",
                    anyhow::anyhow!("Only draft expense requests can be amended"),
                )),
                None => Err(AppError::NotFound(anyhow::anyhow!(
                    "Expense request {} not found",
                    expense_id
                ))),
            },
        }
    }

    /// Get a request by ID.
    pub async fn get(&self, expense_id: Uuid) -> Result<Option<ExpenseRequest>, AppError> {
        let expense = sqlx::query_as::<_, ExpenseRequest>(
            &format!("{} WHERE expense_id = $1", SELECT_EXPENSE),
        )
        .bind(expense_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get expense request: {}", e))
        })?;

        Ok(expense)
    }

    /// List requests, optionally by state, newest first.
    pub async fn list(&self, state: Option<ExpenseState>) -> Result<Vec<ExpenseRequest>, AppError> {
        let expenses = sqlx::query_as::<_, ExpenseRequest>(&format!(
            "{} WHERE ($1::varchar IS NULL OR state = $1) ORDER BY created_utc DESC",
            SELECT_EXPENSE
        ))
        .bind(state.map(|s| s.as_str()))
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list expense requests: {}", e))
        })?;

        Ok(expenses)
    }

    /// Apply a lifecycle event.
    ///
    /// The row is locked (`SELECT ... FOR UPDATE`) for the whole
    /// read-modify-write, so concurrent transitions on the same request
    /// serialize instead of racing. The state change, its event-specific
    /// fields, and the outbox record commit atomically; webhook delivery and
    /// the subscriber broadcast happen after commit and cannot roll it back.
    #[instrument(skip(self, identity), fields(event = %event, actor = %identity.username))]
    pub async fn transition(
        &self,
        expense_id: Uuid,
        event: ExpenseEvent,
        payment_id: Option<Uuid>,
        identity: &AuthenticatedIdentity,
    ) -> Result<ExpenseRequest, AppError> {
        let result = self
            .transition_inner(expense_id, event, payment_id, identity)
            .await;

        let status = if result.is_ok() { "ok" } else { "error" };
        EXPENSE_TRANSITIONS_TOTAL
            .with_label_values(&[event.as_str(), status])
            .inc();

        if result.is_ok() {
            self.dispatcher.dispatch_pending().await;
        }

        result
    }

    async fn transition_inner(
        &self,
        expense_id: Uuid,
        event: ExpenseEvent,
        payment_id: Option<Uuid>,
        identity: &AuthenticatedIdentity,
    ) -> Result<ExpenseRequest, AppError> {
        if matches!(event, ExpenseEvent::Approve | ExpenseEvent::Reject) && !identity.is_admin {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Only administrators can {} expense requests",
                event
            )));
        }

        let mut tx = self.db.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let current = sqlx::query_as::<_, ExpenseRequest>(&format!(
            "{} WHERE expense_id = $1 FOR UPDATE",
            SELECT_EXPENSE
        ))
        .bind(expense_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load expense request: {}", e))
        })?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Expense request {} not found", expense_id))
        })?;

        let state = current.parsed_state().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Expense request {} has unknown state '{}'",
                expense_id,
                current.state
            ))
        })?;

        let outcome = state.apply(event)?;

        if outcome.records_payment {
            let payment_id = payment_id.ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!("Pay requires a payment id"))
            })?;
            let exists: Option<Uuid> =
                sqlx::query_scalar("SELECT payment_id FROM payments WHERE payment_id = $1")
                    .bind(payment_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(anyhow::anyhow!("Failed to check payment: {}", e))
                    })?;
            if exists.is_none() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Payment {} does not exist",
                    payment_id
                )));
            }
        }

        let updated = sqlx::query_as::<_, ExpenseRequest>(
            r#"
            UPDATE expense_requests
            SET state = $2,
                approver = CASE WHEN $3 THEN $4 ELSE approver END,
                approved_at = CASE WHEN $3 THEN $5 ELSE approved_at END,
                payment_id = CASE WHEN $6 THEN $7 ELSE payment_id END,
                updated_utc = NOW()
            WHERE expense_id = $1
            RETURNING expense_id, amount, state, description, requester, approver, approved_at,
                      attachment_id, account_id, category_id, payment_id, created_utc, updated_utc
            "#,
        )
        .bind(expense_id)
        .bind(outcome.next.as_str())
        .bind(outcome.records_approval)
        .bind(&identity.username)
        .bind(Utc::now())
        .bind(outcome.records_payment)
        .bind(payment_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to persist transition: {}", e))
        })?;

        let event_record = StateChangeEvent::expense(
            expense_id,
            state.as_str(),
            outcome.next.as_str(),
            Some(identity.username.clone()),
        );
        outbox::record(&mut tx, &event_record).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transition: {}", e))
        })?;

        info!(
            expense_id = %expense_id,
            from = %state,
            to = %outcome.next,
            "Expense state transition"
        );

        Ok(updated)
    }
}
