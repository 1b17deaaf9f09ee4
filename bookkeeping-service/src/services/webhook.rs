//! Webhook sink client: one JSON POST per event, best-effort.

use crate::models::StateChangeEvent;
use crate::services::metrics::WEBHOOK_DELIVERIES_TOTAL;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the single configured webhook endpoint. No authentication, no
/// retry, no delivery guarantee; a failed delivery is logged and recorded on
/// the outbox row, never surfaced to the caller.
#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    endpoint: Option<String>,
}

impl WebhookClient {
    pub fn new(endpoint: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, endpoint }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Single delivery attempt. `Ok(())` when no endpoint is configured.
    pub async fn deliver(&self, event: &StateChangeEvent) -> Result<(), String> {
        let Some(endpoint) = &self.endpoint else {
            debug!("No webhook endpoint configured, skipping delivery");
            return Ok(());
        };

        let result = self.client.post(endpoint).json(event).send().await;

        match result {
            Ok(response) if response.status().is_success() => {
                WEBHOOK_DELIVERIES_TOTAL.with_label_values(&["ok"]).inc();
                debug!(event_type = %event.event_type, "Webhook delivered");
                Ok(())
            }
            Ok(response) => {
                WEBHOOK_DELIVERIES_TOTAL.with_label_values(&["error"]).inc();
                let msg = format!("Webhook endpoint returned {}", response.status());
                warn!(event_type = %event.event_type, "{}", msg);
                Err(msg)
            }
            Err(e) => {
                WEBHOOK_DELIVERIES_TOTAL.with_label_values(&["error"]).inc();
                let msg = format!("Webhook delivery failed: {}", e);
                warn!(event_type = %event.event_type, "{}", msg);
                Err(msg)
            }
        }
    }
}
