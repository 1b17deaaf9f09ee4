//! Expense request lifecycle.
//!
//! The lifecycle is a closed state machine: every (state, event) pair is
//! matched exhaustively, so an unhandled event is a compile error rather than
//! a silent runtime no-op.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle states of an expense request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseState {
    Draft,
    Pending,
    Approved,
    Paid,
    Rejected,
    Closed,
}

impl ExpenseState {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
            Self::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "paid" => Some(Self::Paid),
            "rejected" => Some(Self::Rejected),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Closed is the only terminal state; Rejected loops back via Edit.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for ExpenseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events that drive the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseEvent {
    Submit,
    Approve,
    Reject,
    Pay,
    Close,
    Edit,
}

impl ExpenseEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Pay => "pay",
            Self::Close => "close",
            Self::Edit => "edit",
        }
    }
}

impl std::fmt::Display for ExpenseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a valid transition: the target state plus the field updates the
/// event implies. Persisting these together is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub next: ExpenseState,
    /// Approve stamps approver and approved_at.
    pub records_approval: bool,
    /// Pay links the settling payment.
    pub records_payment: bool,
}

impl ExpenseState {
    /// The transition table. Everything not listed here is an invalid
    /// transition, rejected with the offending event and current state named.
    pub fn apply(self, event: ExpenseEvent) -> Result<TransitionOutcome, AppError> {
        let outcome = |next| TransitionOutcome {
            next,
            records_approval: false,
            records_payment: false,
        };

        match (self, event) {
            (Self::Draft, ExpenseEvent::Submit) => Ok(outcome(Self::Pending)),
            (Self::Pending, ExpenseEvent::Approve) => Ok(TransitionOutcome {
                next: Self::Approved,
                records_approval: true,
                records_payment: false,
            }),
            (Self::Pending, ExpenseEvent::Reject) => Ok(outcome(Self::Rejected)),
            (Self::Approved, ExpenseEvent::Pay) => Ok(TransitionOutcome {
                next: Self::Paid,
                records_approval: false,
                records_payment: true,
            }),
            (Self::Paid, ExpenseEvent::Close) => Ok(outcome(Self::Closed)),
            (Self::Rejected, ExpenseEvent::Edit) => Ok(outcome(Self::Draft)),
            (state, event) => Err(AppError::BusinessRule(
                "INVALID_TRANSITION",
                anyhow::anyhow!(
                    "Event '{}' is not valid in state '{}'",
                    event,
                    state
                ),
            )),
        }
    }
}

/// Expense request row. State changes only through the transition table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExpenseRequest {
    pub expense_id: Uuid,
    pub amount: Decimal,
    pub state: String,
    pub description: Option<String>,
    pub requester: String,
    pub approver: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub attachment_id: Uuid,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl ExpenseRequest {
    /// Get parsed lifecycle state.
    pub fn parsed_state(&self) -> Option<ExpenseState> {
        ExpenseState::from_str(&self.state)
    }
}

/// Input for creating a request (always starts in Draft). The receipt
/// attachment is mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpenseRequest {
    pub amount: Decimal,
    pub description: Option<String>,
    pub attachment_id: Uuid,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

/// Patch for amending a Draft request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExpenseRequest {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub attachment_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [ExpenseState; 6] = [
        ExpenseState::Draft,
        ExpenseState::Pending,
        ExpenseState::Approved,
        ExpenseState::Paid,
        ExpenseState::Rejected,
        ExpenseState::Closed,
    ];

    const ALL_EVENTS: [ExpenseEvent; 6] = [
        ExpenseEvent::Submit,
        ExpenseEvent::Approve,
        ExpenseEvent::Reject,
        ExpenseEvent::Pay,
        ExpenseEvent::Close,
        ExpenseEvent::Edit,
    ];

    #[test]
    fn happy_path_reaches_closed() {
        let mut state = ExpenseState::Draft;
        for event in [
            ExpenseEvent::Submit,
            ExpenseEvent::Approve,
            ExpenseEvent::Pay,
            ExpenseEvent::Close,
        ] {
            state = state.apply(event).unwrap().next;
        }
        assert_eq!(state, ExpenseState::Closed);
    }

    #[test]
    fn rejected_loops_back_to_draft_via_edit() {
        let rejected = ExpenseState::Pending.apply(ExpenseEvent::Reject).unwrap();
        assert_eq!(rejected.next, ExpenseState::Rejected);
        assert!(!rejected.next.is_terminal());

        let draft = ExpenseState::Rejected.apply(ExpenseEvent::Edit).unwrap();
        assert_eq!(draft.next, ExpenseState::Draft);
    }

    #[test]
    fn approve_records_approval_and_pay_records_payment() {
        let approved = ExpenseState::Pending.apply(ExpenseEvent::Approve).unwrap();
        assert!(approved.records_approval);
        assert!(!approved.records_payment);

        let paid = ExpenseState::Approved.apply(ExpenseEvent::Pay).unwrap();
        assert!(paid.records_payment);
        assert!(!paid.records_approval);
    }

    #[test]
    fn closed_accepts_no_events() {
        for event in ALL_EVENTS {
            let err = ExpenseState::Closed.apply(event).unwrap_err();
            assert_eq!(err.rule_code(), Some("INVALID_TRANSITION"));
        }
    }

    #[test]
    fn exactly_six_transitions_are_defined() {
        let mut valid = 0;
        for state in ALL_STATES {
            for event in ALL_EVENTS {
                if state.apply(event).is_ok() {
                    valid += 1;
                }
            }
        }
        assert_eq!(valid, 6);
    }

    #[test]
    fn invalid_transition_names_event_and_state() {
        let err = ExpenseState::Draft.apply(ExpenseEvent::Pay).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("pay"));
        assert!(msg.contains("draft"));
    }

    #[test]
    fn state_round_trips_through_db_representation() {
        for state in ALL_STATES {
            assert_eq!(ExpenseState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(ExpenseState::from_str("limbo"), None);
    }
}
