//! Outbox events: state-change notifications recorded with the primary write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One recorded side effect. Written inside the same transaction as the
/// primary entity change; delivery happens after commit and never affects it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub entity_id: Uuid,
    pub payload: serde_json::Value,
    pub created_utc: DateTime<Utc>,
    pub delivered_utc: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Webhook/subscription payload: `{type, id, oldState, newState, ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChangeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub id: Uuid,
    pub old_state: String,
    pub new_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl StateChangeEvent {
    pub const EXPENSE_STATE_CHANGED: &'static str = "expense.state_changed";
    pub const INVOICE_STATUS_CHANGED: &'static str = "invoice.status_changed";

    pub fn expense(id: Uuid, old: &str, new: &str, actor: Option<String>) -> Self {
        Self {
            event_type: Self::EXPENSE_STATE_CHANGED.to_string(),
            id,
            old_state: old.to_string(),
            new_state: new.to_string(),
            actor,
        }
    }

    pub fn invoice(id: Uuid, old: &str, new: &str) -> Self {
        Self {
            event_type: Self::INVOICE_STATUS_CHANGED.to_string(),
            id,
            old_state: old.to_string(),
            new_state: new.to_string(),
            actor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_webhook_field_names() {
        let event = StateChangeEvent::expense(Uuid::nil(), "draft", "pending", None);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "expense.state_changed");
        assert_eq!(json["oldState"], "draft");
        assert_eq!(json["newState"], "pending");
        assert!(json.get("actor").is_none());
    }
}
