//! Outbox dispatcher.
//!
//! Services record events inside the same transaction as the primary write,
//! then ask the dispatcher to drain after commit. Delivery failures are
//! recorded on the row and logged; the primary write is never rolled back for
//! a notification.

use crate::models::{OutboxEvent, StateChangeEvent};
use crate::services::database::Database;
use crate::services::events::EventBus;
use crate::services::webhook::WebhookClient;
use service_core::error::AppError;
use sqlx::{Postgres, Transaction};
use tracing::{error, instrument, warn};
use uuid::Uuid;

/// Record an event in the caller's transaction.
pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    event: &StateChangeEvent,
) -> Result<Uuid, AppError> {
    let event_id = Uuid::new_v4();
    let payload = serde_json::to_value(event)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to encode event: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO outbox_events (event_id, event_type, entity_id, payload)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(event_id)
    .bind(&event.event_type)
    .bind(event.id)
    .bind(&payload)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record event: {}", e)))?;

    Ok(event_id)
}

/// Drains recorded events: one webhook attempt each plus an in-process
/// broadcast for subscriptions.
#[derive(Clone)]
pub struct Dispatcher {
    db: Database,
    webhook: WebhookClient,
    bus: EventBus,
}

impl Dispatcher {
    pub fn new(db: Database, webhook: WebhookClient, bus: EventBus) -> Self {
        Self { db, webhook, bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Drain undelivered events. Called synchronously after each commit;
    /// also safe to invoke on a schedule to pick up earlier failures of the
    /// broadcast (the webhook itself gets a single attempt per event).
    #[instrument(skip(self))]
    pub async fn dispatch_pending(&self) {
        let pending = match self.fetch_undelivered().await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to fetch outbox events: {}", e);
                return;
            }
        };

        for row in pending {
            let event: StateChangeEvent = match serde_json::from_value(row.payload.clone()) {
                Ok(event) => event,
                Err(e) => {
                    warn!(event_id = %row.event_id, "Undecodable outbox payload: {}", e);
                    self.mark(row.event_id, Some(format!("undecodable payload: {}", e)))
                        .await;
                    continue;
                }
            };

            // Subscribers get the event regardless of webhook outcome.
            self.bus.publish(event.clone());

            match self.webhook.deliver(&event).await {
                Ok(()) => self.mark(row.event_id, None).await,
                Err(msg) => self.mark(row.event_id, Some(msg)).await,
            }
        }
    }

    async fn fetch_undelivered(&self) -> Result<Vec<OutboxEvent>, AppError> {
        let rows = sqlx::query_as::<_, OutboxEvent>(
            r#"
            SELECT event_id, event_type, entity_id, payload, created_utc, delivered_utc, last_error
            FROM outbox_events
            WHERE delivered_utc IS NULL
            ORDER BY created_utc
            LIMIT 100
            "#,
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch outbox: {}", e)))?;

        Ok(rows)
    }

    /// Mark an event as processed. A failed webhook attempt still counts as
    /// processed (single attempt, no retry); the error stays on the row for
    /// observability.
    async fn mark(&self, event_id: Uuid, error_msg: Option<String>) {
        let result = sqlx::query(
            "UPDATE outbox_events SET delivered_utc = NOW(), last_error = $2 WHERE event_id = $1",
        )
        .bind(event_id)
        .bind(&error_msg)
        .execute(self.db.pool())
        .await;

        if let Err(e) = result {
            error!(event_id = %event_id, "Failed to mark outbox event: {}", e);
        }
    }
}
