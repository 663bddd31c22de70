//! Projection of ticket event notifications into the record store.
//!
//! The relay follows one [`TicketEvent`] and keeps the ticket index and the
//! check-in log in step with it:
//!
//! | Notification   | Record change                           |
//! |----------------|-----------------------------------------|
//! | `CreateTicket` | ticket indexed for the buyer            |
//! | `TicketSold`   | indexed ticket moved to the buyer       |
//! | `TicketUsed`   | check-in logged, ticket leaves the index |
//!
//! Every other notification is ignored.

use crate::records::{RecordStore, TicketRecord, TicketRef, UsedTicketRecord};
use ticketchain_ledger::{TicketEvent, TicketNotification};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Feeds one event's notifications into a [`RecordStore`]
#[derive(Clone, Debug)]
pub struct NotificationRelay {
    event: TicketEvent,
    records: RecordStore,
}

impl NotificationRelay {
    /// Relay from `event` into `records`
    #[must_use]
    pub const fn new(event: TicketEvent, records: RecordStore) -> Self {
        Self { event, records }
    }

    /// Subscribes now and relays in a background task
    ///
    /// Only notifications committed after this call are relayed. The task
    /// keeps the event alive and runs until the handle is aborted.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        let receiver = self.event.subscribe();
        tokio::spawn(self.run(receiver))
    }

    async fn run(self, mut receiver: broadcast::Receiver<TicketNotification>) {
        let event = self.event.address();
        tracing::info!(%event, "Notification relay started");

        loop {
            match receiver.recv().await {
                Ok(notification) => self.apply(&notification).await,
                Err(RecvError::Lagged(skipped)) => {
                    metrics::counter!("ticketchain.relay.lagged").increment(skipped);
                    tracing::warn!(%event, skipped, "Relay lagged; notifications skipped");
                },
                Err(RecvError::Closed) => break,
            }
        }

        tracing::info!(%event, "Notification relay stopped");
    }

    /// Applies one notification to the record store
    pub async fn apply(&self, notification: &TicketNotification) {
        let contract_address = self.event.address().to_string();

        match notification {
            TicketNotification::CreateTicket { buyer, ticket_id } => {
                self.records
                    .add_ticket(TicketRecord {
                        contract_address,
                        event_name: self.event.name().to_string(),
                        user_address: buyer.to_string(),
                        ticket_id: TicketRef::from(*ticket_id),
                    })
                    .await;
            },
            TicketNotification::TicketSold {
                buyer, ticket_id, ..
            } => {
                let moved = self
                    .records
                    .reassign(
                        &contract_address,
                        &TicketRef::from(*ticket_id),
                        &buyer.to_string(),
                    )
                    .await;
                if !moved {
                    tracing::warn!(
                        event = %contract_address,
                        ticket = %ticket_id,
                        "Resold ticket missing from the index"
                    );
                }
            },
            TicketNotification::TicketUsed {
                ticket_id,
                qr_code_key,
                event_name,
                ..
            } => {
                let Some(holder) = self.event.owner_of(*ticket_id).await else {
                    tracing::warn!(
                        event = %contract_address,
                        ticket = %ticket_id,
                        "Checked-in ticket has no holder"
                    );
                    return;
                };
                self.records
                    .check_in(
                        &contract_address,
                        &TicketRef::from(*ticket_id),
                        UsedTicketRecord {
                            user_address: holder.to_string(),
                            event_name: event_name.clone(),
                            qr_code: qr_code_key.clone(),
                        },
                    )
                    .await;
            },
            _ => {},
        }
    }
}
