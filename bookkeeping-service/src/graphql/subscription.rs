//! Subscription root: live state-change notifications off the in-process
//! event bus. Events are broadcast after the originating transaction
//! commits; a lagging subscriber skips missed events instead of erroring.

use async_graphql::{Context, Subscription};
use futures::Stream;
use tokio::sync::broadcast;

use crate::graphql::types::StateChangeObject;
use crate::models::StateChangeEvent;
use crate::startup::Services;

pub struct SubscriptionRoot;

fn event_stream(
    rx: broadcast::Receiver<StateChangeEvent>,
    event_type: &'static str,
) -> impl Stream<Item = StateChangeObject> {
    futures::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) if event.event_type == event_type => {
                    return Some((event.into(), rx));
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

#[Subscription]
impl SubscriptionRoot {
    /// Fires on every committed expense request transition.
    async fn expense_state_changed(
        &self,
        ctx: &Context<'_>,
    ) -> impl Stream<Item = StateChangeObject> {
        let services = ctx.data_unchecked::<Services>();
        event_stream(
            services.dispatcher.bus().subscribe(),
            StateChangeEvent::EXPENSE_STATE_CHANGED,
        )
    }

    /// Fires whenever reconciliation changes an invoice's status.
    async fn invoice_status_changed(
        &self,
        ctx: &Context<'_>,
    ) -> impl Stream<Item = StateChangeObject> {
        let services = ctx.data_unchecked::<Services>();
        event_stream(
            services.dispatcher.bus().subscribe(),
            StateChangeEvent::INVOICE_STATUS_CHANGED,
        )
    }
}
