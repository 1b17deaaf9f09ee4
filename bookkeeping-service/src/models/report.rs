//! Derived reports. Recomputed from the ledger on every query.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One account's contribution to the profit and loss statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitLossLine {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub category: String,
    pub amount: Decimal,
}

/// Profit and loss over a datetime range. Revenue is credit-normal, expense
/// is debit-normal; net = revenue - expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitLossStatement {
    pub total_revenue: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    pub lines: Vec<ProfitLossLine>,
}
