//! Rejections produced by the ticket ledger.
//!
//! Every variant is an all-or-nothing rejection: the ledger state after a
//! rejected call is exactly the state before it.

use crate::types::{Amount, Stage, TicketId, TicketStatus};
use thiserror::Error;
use ticketchain_runtime::StoreError;

/// Invalid constructor arguments
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionError {
    /// Supply must be at least one ticket
    #[error("Number of tickets must be greater than zero")]
    NoTickets,

    /// Royalty is a percentage
    #[error("Royalty percent {0} is out of range (0-100)")]
    RoyaltyOutOfRange(u8),

    /// Name must be non-empty
    #[error("Event name cannot be empty")]
    EmptyName,

    /// Symbol must be non-empty
    #[error("Event symbol cannot be empty")]
    EmptySymbol,
}

/// Rejection of a ticket ledger operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// The operation is not allowed in the current stage
    #[error("{operation} is not allowed while the event is {stage}")]
    InvalidStage {
        /// Rejected operation
        operation: &'static str,
        /// Stage at the time of the call
        stage: Stage,
    },

    /// Payment below the asking price
    #[error("Insufficient payment: required {required}, offered {offered}")]
    InsufficientPayment {
        /// Asking price
        required: Amount,
        /// Value sent with the call
        offered: Amount,
    },

    /// No primary inventory left
    #[error("Event is sold out")]
    SoldOut,

    /// No ticket with this id has been issued
    #[error("Ticket {ticket_id} does not exist")]
    UnknownTicket {
        /// Requested ticket
        ticket_id: TicketId,
    },

    /// Caller does not hold the ticket
    #[error("Caller does not own ticket {ticket_id}")]
    NotTicketOwner {
        /// Requested ticket
        ticket_id: TicketId,
    },

    /// Ticket already checked in
    #[error("Ticket {ticket_id} has already been used")]
    AlreadyUsed {
        /// Requested ticket
        ticket_id: TicketId,
    },

    /// The event does not allow resale
    #[error("Tickets for this event cannot be resold")]
    ResaleDisabled,

    /// Ticket is not in a state that allows the operation
    #[error("Ticket {ticket_id} cannot be used here (status {status}, refunded: {refunded})")]
    InvalidTicketState {
        /// Requested ticket
        ticket_id: TicketId,
        /// Status at the time of the call
        status: TicketStatus,
        /// Whether the ticket was voided by a cancellation refund
        refunded: bool,
    },

    /// Caller is not the seller-approved buyer
    #[error("Caller is not the approved buyer for ticket {ticket_id}")]
    NotApprovedBuyer {
        /// Requested ticket
        ticket_id: TicketId,
    },

    /// Ticket is not listed
    #[error("Ticket {ticket_id} is not for sale")]
    TicketNotForSale {
        /// Requested ticket
        ticket_id: TicketId,
    },

    /// Nothing to withdraw
    #[error("No balance to withdraw")]
    NoBalance,

    /// Caller is not the event owner
    #[error("Caller is not the event owner")]
    NotOwner,

    /// Owner revenue was already withdrawn
    #[error("Owner revenue has already been withdrawn")]
    AlreadyWithdrawn,

    /// Accepting the payment would overflow the escrow
    #[error("Payment overflows the event escrow")]
    EscrowOverflow,

    /// Invalid constructor arguments
    #[error("Invalid event parameters: {0}")]
    Construction(#[from] ConstructionError),

    /// Runtime rejection (e.g. shutting down)
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TicketError {
    pub(crate) const fn invalid_stage(operation: &'static str, stage: Stage) -> Self {
        Self::InvalidStage { operation, stage }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let error = TicketError::invalid_stage("buyTicket", Stage::Paused);
        assert_eq!(error.to_string(), "buyTicket is not allowed while the event is Paused");

        let error = TicketError::InsufficientPayment {
            required: Amount::from_units(50),
            offered: Amount::from_units(49),
        };
        assert_eq!(
            error.to_string(),
            "Insufficient payment: required 50, offered 49"
        );

        let error = TicketError::InvalidTicketState {
            ticket_id: TicketId::new(3),
            status: TicketStatus::Owned,
            refunded: true,
        };
        assert_eq!(
            error.to_string(),
            "Ticket 3 cannot be used here (status Owned, refunded: true)"
        );
    }

    #[test]
    fn construction_errors_convert() {
        let error: TicketError = ConstructionError::RoyaltyOutOfRange(101).into();
        assert_eq!(
            error,
            TicketError::Construction(ConstructionError::RoyaltyOutOfRange(101))
        );
    }
}
