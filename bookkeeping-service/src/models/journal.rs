//! Double-entry journal model and the balance gate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sqlx::FromRow;
use uuid::Uuid;

/// Journal entry header. Lines are exclusively owned and cascade on delete.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: Uuid,
    pub entry_datetime: DateTime<Utc>,
    pub description: Option<String>,
    pub created_by: String,
    pub created_utc: DateTime<Utc>,
}

/// One debit or credit leg of an entry. Exactly one of debit/credit should be
/// populated per line; the invariant is enforced in aggregate by the balance
/// gate, not per line.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct JournalLine {
    pub line_id: Uuid,
    pub entry_id: Uuid,
    pub account_id: Uuid,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
}

/// Entry with its lines joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntryWithLines {
    pub entry: JournalEntry,
    pub lines: Vec<JournalLine>,
}

/// Line input for create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLineInput {
    pub account_id: Uuid,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
}

/// Input for creating an entry. Missing datetime defaults to now; an empty
/// line list is vacuously balanced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJournalEntry {
    pub entry_datetime: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub lines: Vec<JournalLineInput>,
}

/// Patch for updating an entry. Supplying `lines` replaces every existing
/// line (delete-then-recreate, not merge).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateJournalEntry {
    pub entry_datetime: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub lines: Option<Vec<JournalLineInput>>,
}

/// Filter for listing entries.
#[derive(Debug, Clone, Default)]
pub struct JournalRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

/// Balance gate applied before every journal mutation: the debit and credit
/// sums must match under exact decimal comparison. Floating-point epsilon
/// comparison is not acceptable for money.
pub fn ensure_balanced(lines: &[JournalLineInput]) -> Result<(), AppError> {
    let mut debit_sum = Decimal::ZERO;
    let mut credit_sum = Decimal::ZERO;

    for line in lines {
        if let Some(debit) = line.debit {
            debit_sum += debit;
        }
        if let Some(credit) = line.credit {
            credit_sum += credit;
        }
    }

    if debit_sum != credit_sum {
        return Err(AppError::BusinessRule(
            "DEBIT_CREDIT_MISMATCH",
            anyhow::anyhow!(
                "Journal entry is not balanced: debits ({}) != credits ({})",
                debit_sum,
                credit_sum
            ),
        ));
    }

    Ok(())
}
