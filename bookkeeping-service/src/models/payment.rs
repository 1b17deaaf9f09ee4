//! Payment model and the reconciliation math.

use crate::models::invoice::InvoiceStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Direction of money flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentDirection {
    In,
    Out,
}

impl PaymentDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }
}

/// Settlement method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Bank,
    Cash,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bank" => Some(Self::Bank),
            "cash" => Some(Self::Cash),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Reconciliation outcome attributed to a payment. Engine-derived, never
/// user-supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentLabel {
    Normal,
    Partial,
    Overpay,
}

impl PaymentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Partial => "partial",
            Self::Overpay => "overpay",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(Self::Normal),
            "partial" => Some(Self::Partial),
            "overpay" => Some(Self::Overpay),
            _ => None,
        }
    }
}

/// Payment row. References at most one of invoice / expense request.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    pub direction: String,
    pub method: String,
    pub label: String,
    pub invoice_id: Option<Uuid>,
    pub expense_request_id: Option<Uuid>,
    pub overpaid_amount: Option<Decimal>,
    pub note: Option<String>,
    pub created_by: String,
    pub created_utc: DateTime<Utc>,
}

impl Payment {
    pub fn parsed_direction(&self) -> Option<PaymentDirection> {
        PaymentDirection::from_str(&self.direction)
    }

    pub fn parsed_method(&self) -> Option<PaymentMethod> {
        PaymentMethod::from_str(&self.method)
    }

    pub fn parsed_label(&self) -> Option<PaymentLabel> {
        PaymentLabel::from_str(&self.label)
    }
}

/// Input for creating a payment. `invoice_id` and `expense_request_id` are
/// mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayment {
    pub amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub direction: PaymentDirection,
    pub method: PaymentMethod,
    pub invoice_id: Option<Uuid>,
    pub expense_request_id: Option<Uuid>,
    pub note: Option<String>,
}

/// Patch for updating a payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePayment {
    pub amount: Option<Decimal>,
    pub paid_at: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
    pub invoice_id: Option<Option<Uuid>>,
    pub note: Option<String>,
}

/// Outcome of reconciling an invoice against the decimal-exact sum of its
/// linked payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub status: InvoiceStatus,
    pub label: PaymentLabel,
    pub overpaid_amount: Option<Decimal>,
}

impl Reconciliation {
    pub fn compute(invoice_amount: Decimal, paid_sum: Decimal) -> Self {
        if paid_sum == Decimal::ZERO {
            Self {
                status: InvoiceStatus::Unpaid,
                label: PaymentLabel::Normal,
                overpaid_amount: None,
            }
        } else if paid_sum < invoice_amount {
            Self {
                status: InvoiceStatus::Partial,
                label: PaymentLabel::Partial,
                overpaid_amount: None,
            }
        } else if paid_sum == invoice_amount {
            Self {
                status: InvoiceStatus::Paid,
                label: PaymentLabel::Normal,
                overpaid_amount: None,
            }
        } else {
            // Overpayment still settles the invoice; the excess is recorded
            // on the payment, not the invoice status.
            Self {
                status: InvoiceStatus::Paid,
                label: PaymentLabel::Overpay,
                overpaid_amount: Some(paid_sum - invoice_amount),
            }
        }
    }
}
