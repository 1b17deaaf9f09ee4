//! Financial reporting over the journal.

use crate::models::{AccountCategory, ProfitLossLine, ProfitLossStatement};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::FromRow;
use tracing::instrument;
use uuid::Uuid;

use super::database::Database;

#[derive(FromRow)]
struct AccountTotal {
    account_id: Uuid,
    account_code: String,
    account_name: String,
    category: String,
    debit_total: Decimal,
    credit_total: Decimal,
}

impl Database {
    /// Profit and loss over a datetime range, aggregated from journal lines
    /// on revenue and expense accounts. Revenue contributes credit minus
    /// debit, expense contributes debit minus credit; net is revenue minus
    /// expense.
    #[instrument(skip(self))]
    pub async fn profit_loss(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ProfitLossStatement, AppError> {
        let totals = sqlx::query_as::<_, AccountTotal>(
            r#"
            SELECT a.account_id,
                   a.code AS account_code,
                   a.name AS account_name,
                   a.category,
                   COALESCE(SUM(l.debit), 0) AS debit_total,
                   COALESCE(SUM(l.credit), 0) AS credit_total
            FROM journal_lines l
            JOIN journal_entries e ON e.entry_id = l.entry_id
            JOIN accounts a ON a.account_id = l.account_id
            WHERE e.entry_datetime >= $1 AND e.entry_datetime < $2
              AND a.category IN ('revenue', 'expense')
            GROUP BY a.account_id, a.code, a.name, a.category
            ORDER BY a.code
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to aggregate profit/loss: {}", e))
        })?;

        let mut lines = Vec::with_capacity(totals.len());
        let mut total_revenue = Decimal::ZERO;
        let mut total_expense = Decimal::ZERO;

        for total in totals {
            let amount = match AccountCategory::from_str(&total.category) {
                Some(AccountCategory::Revenue) => {
                    let amount = total.credit_total - total.debit_total;
                    total_revenue += amount;
                    amount
                }
                Some(AccountCategory::Expense) => {
                    let amount = total.debit_total - total.credit_total;
                    total_expense += amount;
                    amount
                }
                _ => continue,
            };

            lines.push(ProfitLossLine {
                account_id: total.account_id,
                account_code: total.account_code,
                account_name: total.account_name,
                category: total.category,
                amount,
            });
        }

        Ok(ProfitLossStatement {
            total_revenue,
            total_expense,
            net: total_revenue - total_expense,
            lines,
        })
    }
}
