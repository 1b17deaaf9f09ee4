//! Per-category fiscal-year budgets.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Planned spend for one category in one fiscal year. `(category_id,
/// fiscal_year)` is unique; writes are upserts.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Budget {
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub fiscal_year: i32,
    pub amount_planned: Decimal,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for upserting a budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetBudget {
    pub category_id: Uuid,
    pub fiscal_year: i32,
    pub amount_planned: Decimal,
}

impl SetBudget {
    /// Earliest fiscal year the suite accepts.
    pub const MIN_FISCAL_YEAR: i32 = 2000;
}
