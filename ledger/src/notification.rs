//! Notifications emitted on committed operations.
//!
//! These are the facts external listeners consume: the ticket index records
//! `CreateTicket` / `TicketSold`, the entry-verification backend records
//! `TicketUsed`.

use crate::types::{Address, Amount, Stage, TicketId};
use serde::{Deserialize, Serialize};

/// What a committed ticket event operation changed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TicketNotification {
    /// Owner moved the event to another stage
    StageChanged {
        /// Previous stage
        from: Stage,
        /// New stage
        to: Stage,
    },

    /// Primary sale
    CreateTicket {
        /// New holder
        buyer: Address,
        /// Issued ticket
        ticket_id: TicketId,
    },

    /// Holder checked in
    TicketUsed {
        /// Redeemed ticket
        ticket_id: TicketId,
        /// Redemption key presented at the gate
        qr_code_key: String,
        /// Event instance
        contract_address: Address,
        /// Event name
        event_name: String,
    },

    /// Holder listed a ticket
    TicketForSale {
        /// Listed ticket
        ticket_id: TicketId,
    },

    /// Prospective buyer asked to purchase a listed ticket
    BuyerRegistered {
        /// Listed ticket
        ticket_id: TicketId,
        /// Prospective buyer
        buyer: Address,
    },

    /// Holder authorized a buyer
    BuyerApproved {
        /// Ticket
        ticket_id: TicketId,
        /// Authorized buyer
        buyer: Address,
    },

    /// Secondary sale
    TicketSold {
        /// New holder
        buyer: Address,
        /// Previous holder
        seller: Address,
        /// Sold ticket
        ticket_id: TicketId,
        /// Resale price paid
        price: Amount,
    },

    /// Face value moved back to a holder after cancellation
    RefundIssued {
        /// Refunded holder
        holder: Address,
        /// Voided ticket
        ticket_id: TicketId,
        /// Refunded amount
        money: Amount,
    },

    /// Pending balance paid out
    WithdrawMoney {
        /// Recipient
        receiver: Address,
        /// Paid amount
        money: Amount,
    },

    /// Owner revenue paid out
    OwnerWithdrawMoney {
        /// Event owner
        owner: Address,
        /// Paid amount
        money: Amount,
    },

    /// A payout failed and the amount was credited back
    PayoutReverted {
        /// Intended recipient
        receiver: Address,
        /// Restored amount
        money: Amount,
    },
}

impl TicketNotification {
    /// Ticket the notification is about, if any
    #[must_use]
    pub const fn ticket_id(&self) -> Option<TicketId> {
        match self {
            Self::CreateTicket { ticket_id, .. }
            | Self::TicketUsed { ticket_id, .. }
            | Self::TicketForSale { ticket_id }
            | Self::BuyerRegistered { ticket_id, .. }
            | Self::BuyerApproved { ticket_id, .. }
            | Self::TicketSold { ticket_id, .. }
            | Self::RefundIssued { ticket_id, .. } => Some(*ticket_id),
            Self::StageChanged { .. }
            | Self::WithdrawMoney { .. }
            | Self::OwnerWithdrawMoney { .. }
            | Self::PayoutReverted { .. } => None,
        }
    }
}

/// What the event registry recorded
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RegistryNotification {
    /// A new ticket event was created
    CreateEvent {
        /// Creator and owner of the event
        creator: Address,
        /// The event's address
        event: Address,
    },
}
