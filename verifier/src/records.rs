//! In-memory record store behind the ticket index and the gate check.
//!
//! Two record sets are kept: the ticket index (who currently holds which
//! ticket of which event) and the check-in log (which user presented which
//! QR code at which event). Checking a ticket in moves it from the first set
//! to the second.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ticketchain_ledger::TicketId;
use tokio::sync::RwLock;

/// Ticket identifier as clients send it
///
/// The web client sends numeric ids, older clients sent strings. Both are
/// kept verbatim and echoed back in the same JSON form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TicketRef {
    /// Numeric ticket id
    Index(u64),
    /// Any other identifier
    Key(String),
}

impl From<TicketId> for TicketRef {
    fn from(id: TicketId) -> Self {
        Self::Index(u64::from(id.value()))
    }
}

impl std::fmt::Display for TicketRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Key(key) => f.write_str(key),
        }
    }
}

/// A ticket held by a user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Address of the event the ticket belongs to
    pub contract_address: String,
    /// Event name
    pub event_name: String,
    /// Current holder
    pub user_address: String,
    /// Ticket id within the event
    pub ticket_id: TicketRef,
}

impl TicketRecord {
    fn is(&self, contract_address: &str, ticket_id: &TicketRef) -> bool {
        self.contract_address == contract_address && &self.ticket_id == ticket_id
    }
}

/// A completed check-in
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedTicketRecord {
    /// Holder at check-in time
    pub user_address: String,
    /// Event name
    pub event_name: String,
    /// QR code presented at the gate
    pub qr_code: String,
}

#[derive(Debug, Default)]
struct Records {
    tickets: Vec<TicketRecord>,
    used: Vec<UsedTicketRecord>,
}

/// Shared handle to the record sets
///
/// Cloning is cheap; clones see the same records.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    inner: Arc<RwLock<Records>>,
}

impl RecordStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a ticket to the index
    pub async fn add_ticket(&self, record: TicketRecord) {
        self.inner.write().await.tickets.push(record);
    }

    /// Tickets currently held by `user_address`, in insertion order
    pub async fn tickets_for(&self, user_address: &str) -> Vec<TicketRecord> {
        self.inner
            .read()
            .await
            .tickets
            .iter()
            .filter(|record| record.user_address == user_address)
            .cloned()
            .collect()
    }

    /// Moves an indexed ticket to `new_holder`
    ///
    /// Returns `false` when no ticket with that id is indexed for the event.
    pub async fn reassign(
        &self,
        contract_address: &str,
        ticket_id: &TicketRef,
        new_holder: &str,
    ) -> bool {
        let mut records = self.inner.write().await;
        match records
            .tickets
            .iter_mut()
            .find(|record| record.is(contract_address, ticket_id))
        {
            Some(record) => {
                new_holder.clone_into(&mut record.user_address);
                true
            },
            None => false,
        }
    }

    /// Logs a check-in and drops the ticket from the index
    ///
    /// Returns the number of index entries removed.
    pub async fn check_in(
        &self,
        contract_address: &str,
        ticket_id: &TicketRef,
        used: UsedTicketRecord,
    ) -> usize {
        let mut records = self.inner.write().await;
        records.used.push(used);

        let before = records.tickets.len();
        records
            .tickets
            .retain(|record| !record.is(contract_address, ticket_id));
        before - records.tickets.len()
    }

    /// Check-ins made by `user_address`
    pub async fn used_by(&self, user_address: &str) -> Vec<UsedTicketRecord> {
        self.inner
            .read()
            .await
            .used
            .iter()
            .filter(|record| record.user_address == user_address)
            .cloned()
            .collect()
    }

    /// Whether `user_address` checked in to `event_name` with `qr_code`
    pub async fn is_checked_in(&self, user_address: &str, event_name: &str, qr_code: &str) -> bool {
        self.inner.read().await.used.iter().any(|record| {
            record.user_address == user_address
                && record.event_name == event_name
                && record.qr_code == qr_code
        })
    }

    /// Removes every record from both sets
    pub async fn reset(&self) {
        let mut records = self.inner.write().await;
        records.tickets.clear();
        records.used.clear();
    }

    /// Number of indexed tickets
    pub async fn ticket_count(&self) -> usize {
        self.inner.read().await.tickets.len()
    }

    /// Number of logged check-ins
    pub async fn used_count(&self) -> usize {
        self.inner.read().await.used.len()
    }
}
