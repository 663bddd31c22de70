//! Per-event ledger state.
//!
//! `EventState` is only mutated by [`TicketReducer`](crate::reducer::TicketReducer);
//! everything here is construction and read-only queries.

use crate::error::ConstructionError;
use crate::types::{Address, Amount, EventParams, Stage, Ticket, TicketId, TicketStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// State of one ticket event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventState {
    /// The event's own address
    pub address: Address,
    /// Identity authorized for stage changes and revenue withdrawal
    pub owner: Address,
    /// Display name
    pub name: String,
    /// Display symbol
    pub symbol: String,
    /// Lifecycle stage
    pub stage: Stage,
    /// Primary sale price
    pub ticket_price: Amount,
    /// Total supply
    pub num_tickets_total: u32,
    /// Unsold primary inventory
    pub num_tickets_left: u32,
    /// Whether holders may resell
    pub can_be_resold: bool,
    /// Owner's share of each resale, 0–100
    pub royalty_percent: u8,
    /// Issued tickets; the index is the ticket id
    pub tickets: Vec<Ticket>,
    /// Pending withdrawals per identity, paid out by `withdraw`
    pub balances: HashMap<Address, Amount>,
    /// Primary sale face value and resale royalties, paid out by `ownerWithdraw`
    pub owner_revenue: Amount,
    /// Whether `ownerWithdraw` has paid out
    pub owner_revenue_withdrawn: bool,
    /// Value currently held by the event
    pub escrow: Amount,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

impl EventState {
    /// Validates `params` and builds the initial state
    ///
    /// The owner is `params.owner` when given, otherwise `creator`.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError`] when any parameter is invalid; nothing
    /// is created in that case.
    pub fn new(
        address: Address,
        creator: Address,
        params: EventParams,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ConstructionError> {
        Self::validate(&params)?;

        Ok(Self {
            address,
            owner: params.owner.unwrap_or(creator),
            name: params.name,
            symbol: params.symbol,
            stage: Stage::Prep,
            ticket_price: params.price,
            num_tickets_total: params.num_tickets,
            num_tickets_left: params.num_tickets,
            can_be_resold: params.can_be_resold,
            royalty_percent: params.royalty_percent,
            tickets: Vec::new(),
            balances: HashMap::new(),
            owner_revenue: Amount::ZERO,
            owner_revenue_withdrawn: false,
            escrow: Amount::ZERO,
            created_at,
        })
    }

    fn validate(params: &EventParams) -> Result<(), ConstructionError> {
        if params.num_tickets == 0 {
            return Err(ConstructionError::NoTickets);
        }

        if params.royalty_percent > 100 {
            return Err(ConstructionError::RoyaltyOutOfRange(params.royalty_percent));
        }

        if params.name.trim().is_empty() {
            return Err(ConstructionError::EmptyName);
        }

        if params.symbol.trim().is_empty() {
            return Err(ConstructionError::EmptySymbol);
        }

        Ok(())
    }

    /// Returns a ticket by id
    #[must_use]
    pub fn ticket(&self, ticket_id: TicketId) -> Option<&Ticket> {
        self.tickets.get(ticket_id.index())
    }

    /// Current holder of a ticket
    #[must_use]
    pub fn owner_of(&self, ticket_id: TicketId) -> Option<Address> {
        self.ticket(ticket_id).map(|ticket| ticket.owner)
    }

    /// Status of a ticket
    #[must_use]
    pub fn ticket_status(&self, ticket_id: TicketId) -> Option<TicketStatus> {
        self.ticket(ticket_id).map(|ticket| ticket.status)
    }

    /// Number of tickets held by `address`
    #[must_use]
    pub fn balance_of(&self, address: Address) -> usize {
        self.tickets
            .iter()
            .filter(|ticket| ticket.owner == address)
            .count()
    }

    /// Pending withdrawal for `address`
    ///
    /// For the owner this includes the revenue held for `ownerWithdraw`.
    #[must_use]
    pub fn pending_balance(&self, address: Address) -> Amount {
        let own = self.withdrawable(address);
        if address == self.owner {
            own + self.owner_revenue
        } else {
            own
        }
    }

    /// Amount `withdraw` would pay `address`
    #[must_use]
    pub fn withdrawable(&self, address: Address) -> Amount {
        self.balances.get(&address).copied().unwrap_or_default()
    }

    /// Sum of every pending withdrawal, owner revenue included
    #[must_use]
    pub fn total_balances(&self) -> Amount {
        self.balances
            .values()
            .fold(self.owner_revenue, |total, balance| total + *balance)
    }

    /// Tickets sold on the primary market
    #[must_use]
    pub const fn tickets_sold(&self) -> u32 {
        self.num_tickets_total - self.num_tickets_left
    }

    /// Id the next primary sale receives
    #[must_use]
    pub fn next_ticket_id(&self) -> TicketId {
        TicketId::new(self.tickets_sold())
    }

    /// Ids of tickets currently listed for resale
    #[must_use]
    pub fn tickets_for_sale(&self) -> Vec<TicketId> {
        self.issued()
            .filter(|(_, ticket)| ticket.status == TicketStatus::ForSale)
            .map(|(id, _)| id)
            .collect()
    }

    /// Issued tickets with their ids, in id order
    pub fn issued(&self) -> impl Iterator<Item = (TicketId, &Ticket)> {
        (0..self.tickets_sold()).map(TicketId::new).zip(self.tickets.iter())
    }

    pub(crate) fn ticket_mut(&mut self, ticket_id: TicketId) -> Option<&mut Ticket> {
        self.tickets.get_mut(ticket_id.index())
    }

    /// Adds to a pending balance
    ///
    /// Callers credit only value already added to `escrow`, and every
    /// balance is bounded by `escrow`, so this cannot overflow.
    pub(crate) fn credit(&mut self, address: Address, amount: Amount) {
        if amount.is_zero() {
            return;
        }
        *self.balances.entry(address).or_insert(Amount::ZERO) += amount;
    }

    /// Removes and returns a pending balance
    pub(crate) fn take_balance(&mut self, address: Address) -> Amount {
        self.balances.remove(&address).unwrap_or_default()
    }

    /// Removes and returns the owner revenue
    pub(crate) fn take_owner_revenue(&mut self) -> Amount {
        std::mem::take(&mut self.owner_revenue)
    }
}
