//! Ledger account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Account categories following standard accounting classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountCategory {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountCategory {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "asset" => Some(Self::Asset),
            "liability" => Some(Self::Liability),
            "equity" => Some(Self::Equity),
            "revenue" => Some(Self::Revenue),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger account. Reference data: immutable once journal lines point at it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub category: String,
    pub created_utc: DateTime<Utc>,
}

impl Account {
    /// Get parsed account category.
    pub fn parsed_category(&self) -> Option<AccountCategory> {
        AccountCategory::from_str(&self.category)
    }
}

/// Input for creating a new account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAccount {
    #[validate(length(min = 1, max = 16))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub category: AccountCategory,
}

/// Accounts the bootstrap routine guarantees at startup. The payment and
/// invoice engines post automatic journal entries against these codes.
pub const BOOTSTRAP_ACCOUNTS: &[(&str, &str, AccountCategory)] = &[
    ("101", "Cash", AccountCategory::Asset),
    ("102", "Bank", AccountCategory::Asset),
    ("120", "Accounts Receivable", AccountCategory::Asset),
    ("401", "Sales Revenue", AccountCategory::Revenue),
    ("501", "General Expense", AccountCategory::Expense),
];

/// Account code used to debit incoming cash payments.
pub const CODE_CASH: &str = "101";
/// Account code used to debit incoming bank payments.
pub const CODE_BANK: &str = "102";
/// Accounts receivable, debited on invoice issuance.
pub const CODE_RECEIVABLE: &str = "120";
/// Revenue, credited on invoice issuance.
pub const CODE_REVENUE: &str = "401";
/// General expense, debited on outgoing payments.
pub const CODE_EXPENSE: &str = "501";
