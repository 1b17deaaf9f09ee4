//! Invoice model and numbering.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Invoice payment status. Derived by the reconciliation engine, never set
/// directly by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Unpaid,
    Partial,
    Paid,
    Overpay,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overpay => "overpay",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "unpaid" => Some(Self::Unpaid),
            "partial" => Some(Self::Partial),
            "paid" => Some(Self::Paid),
            "overpay" => Some(Self::Overpay),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Invoice row. The PDF lives in object storage under `pdf_key`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub invoice_no: String,
    pub partner_name: String,
    pub amount: Decimal,
    pub status: String,
    pub pdf_key: String,
    pub due_date: NaiveDate,
    pub created_by: String,
    pub created_utc: DateTime<Utc>,
}

impl Invoice {
    pub fn parsed_status(&self) -> Option<InvoiceStatus> {
        InvoiceStatus::from_str(&self.status)
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInvoice {
    #[validate(length(min = 1, max = 200))]
    pub partner_name: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

/// Format an invoice number: `INV-{year}-{4-digit-seq}`.
///
/// The zero padding is what makes a lexicographic `ORDER BY invoice_no DESC`
/// scan return the highest sequence first.
pub fn format_invoice_no(year: i32, seq: u32) -> String {
    format!("INV-{}-{:04}", year, seq)
}

/// Prefix for all invoice numbers of one calendar year.
pub fn invoice_no_prefix(year: i32) -> String {
    format!("INV-{}-", year)
}

/// Compute the next invoice number for `now`, given the lexicographically
/// highest existing number within the year (if any). A new calendar year
/// resets the sequence to 0001.
pub fn next_invoice_no(now: DateTime<Utc>, highest_this_year: Option<&str>) -> String {
    let year = now.year();
    let next_seq = highest_this_year
        .and_then(|no| no.rsplit('-').next())
        .and_then(|seq| seq.parse::<u32>().ok())
        .map(|seq| seq + 1)
        .unwrap_or(1);
    format_invoice_no(year, next_seq)
}
