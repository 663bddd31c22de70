//! `TicketEvent`: handle to one ticket event instance.
//!
//! Wraps a [`Store`] running the [`TicketReducer`]. Each method is one
//! atomic operation; `Ok` means the operation committed and its
//! notifications were broadcast. Payouts scheduled by withdrawals are in
//! the returned [`Receipt`]'s effect handle.

use crate::environment::TicketEnvironment;
use crate::error::TicketError;
use crate::notification::TicketNotification;
use crate::reducer::{TicketAction, TicketReducer};
use crate::state::EventState;
use crate::types::{Address, Amount, EventParams, Stage, Ticket, TicketId, TicketStatus};
use std::sync::Arc;
use std::time::Duration;
use ticketchain_runtime::{DEFAULT_BROADCAST_CAPACITY, Receipt, Store, StoreError};
use tokio::sync::broadcast;

/// Result of a committed ticket event operation
pub type TicketReceipt = Receipt<TicketNotification>;

/// Values fixed at construction
#[derive(Clone, Debug)]
struct EventInfo {
    address: Address,
    owner: Address,
    name: String,
    symbol: String,
    price: Amount,
    num_tickets_total: u32,
    can_be_resold: bool,
    royalty_percent: u8,
}

/// Handle to a ticket event
///
/// Cloning is cheap; all clones operate on the same ledger.
#[derive(Clone)]
pub struct TicketEvent {
    info: Arc<EventInfo>,
    store: Store<TicketReducer>,
}

impl TicketEvent {
    /// Deploys a new event at a fresh address
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Construction`] when `params` are invalid.
    pub fn deploy(
        creator: Address,
        params: EventParams,
        env: TicketEnvironment,
    ) -> Result<Self, TicketError> {
        Self::deploy_at(Address::new(), creator, params, env)
    }

    /// Deploys a new event at `address`
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Construction`] when `params` are invalid.
    pub fn deploy_at(
        address: Address,
        creator: Address,
        params: EventParams,
        env: TicketEnvironment,
    ) -> Result<Self, TicketError> {
        Self::deploy_with_capacity(address, creator, params, env, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Deploys a new event with a custom notification buffer
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Construction`] when `params` are invalid.
    pub fn deploy_with_capacity(
        address: Address,
        creator: Address,
        params: EventParams,
        env: TicketEnvironment,
        capacity: usize,
    ) -> Result<Self, TicketError> {
        let state = EventState::new(address, creator, params, env.clock.now())?;

        let info = EventInfo {
            address: state.address,
            owner: state.owner,
            name: state.name.clone(),
            symbol: state.symbol.clone(),
            price: state.ticket_price,
            num_tickets_total: state.num_tickets_total,
            can_be_resold: state.can_be_resold,
            royalty_percent: state.royalty_percent,
        };

        tracing::info!(
            event = %info.address,
            owner = %info.owner,
            name = %info.name,
            tickets = info.num_tickets_total,
            price = %info.price,
            "Ticket event deployed"
        );

        Ok(Self {
            info: Arc::new(info),
            store: Store::with_broadcast_capacity(state, TicketReducer::new(), env, capacity),
        })
    }

    // ========== Commands ==========

    /// Sets the lifecycle stage (owner only)
    ///
    /// The first move to [`Stage::Cancelled`] refunds the face value of
    /// every unused ticket to its holder.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotOwner`] when `caller` is not the owner.
    pub async fn set_stage(
        &self,
        caller: Address,
        stage: Stage,
    ) -> Result<TicketReceipt, TicketError> {
        self.store.send(TicketAction::SetStage { caller, stage }).await
    }

    /// Buys the next ticket on the primary market
    ///
    /// # Errors
    ///
    /// `InvalidStage`, `SoldOut` or `InsufficientPayment`, in that order.
    pub async fn buy_ticket(
        &self,
        caller: Address,
        payment: Amount,
    ) -> Result<TicketReceipt, TicketError> {
        self.store
            .send(TicketAction::BuyTicket { caller, payment })
            .await
    }

    /// Checks a ticket in
    ///
    /// # Errors
    ///
    /// `InvalidStage`, `UnknownTicket`, `NotTicketOwner`, `AlreadyUsed`, or
    /// `InvalidTicketState` for a refunded ticket.
    pub async fn set_ticket_to_used(
        &self,
        caller: Address,
        ticket_id: TicketId,
        qr_code_key: impl Into<String>,
    ) -> Result<TicketReceipt, TicketError> {
        self.store
            .send(TicketAction::SetTicketToUsed {
                caller,
                ticket_id,
                qr_code_key: qr_code_key.into(),
            })
            .await
    }

    /// Lists a ticket on the secondary market
    ///
    /// # Errors
    ///
    /// `InvalidStage`, `ResaleDisabled`, `UnknownTicket`, `NotTicketOwner`
    /// or `InvalidTicketState`.
    pub async fn set_ticket_for_sale(
        &self,
        caller: Address,
        ticket_id: TicketId,
        resale_price: Amount,
    ) -> Result<TicketReceipt, TicketError> {
        self.store
            .send(TicketAction::SetTicketForSale {
                caller,
                ticket_id,
                resale_price,
            })
            .await
    }

    /// Authorizes `buyer` to purchase the caller's ticket
    ///
    /// There is a single approval slot; the last approval wins.
    ///
    /// # Errors
    ///
    /// `UnknownTicket` or `NotTicketOwner`.
    pub async fn approve_as_buyer(
        &self,
        caller: Address,
        buyer: Address,
        ticket_id: TicketId,
    ) -> Result<TicketReceipt, TicketError> {
        self.store
            .send(TicketAction::ApproveAsBuyer {
                caller,
                buyer,
                ticket_id,
            })
            .await
    }

    /// Registers the caller's interest in a listed ticket
    ///
    /// Registration does not authorize a purchase.
    ///
    /// # Errors
    ///
    /// `InvalidStage`, `UnknownTicket`, `TicketNotForSale`, or
    /// `InvalidTicketState` when the caller already holds the ticket.
    pub async fn register_as_buyer(
        &self,
        caller: Address,
        ticket_id: TicketId,
    ) -> Result<TicketReceipt, TicketError> {
        self.store
            .send(TicketAction::RegisterAsBuyer { caller, ticket_id })
            .await
    }

    /// Buys a listed ticket as its approved buyer
    ///
    /// # Errors
    ///
    /// `InvalidStage`, `UnknownTicket`, `TicketNotForSale`,
    /// `NotApprovedBuyer` or `InsufficientPayment`, in that order.
    pub async fn buy_ticket_from_user(
        &self,
        caller: Address,
        ticket_id: TicketId,
        payment: Amount,
    ) -> Result<TicketReceipt, TicketError> {
        self.store
            .send(TicketAction::BuyTicketFromUser {
                caller,
                ticket_id,
                payment,
            })
            .await
    }

    /// Pays out the caller's pending balance
    ///
    /// The owner's revenue is not included; it leaves through
    /// [`owner_withdraw`](Self::owner_withdraw).
    ///
    /// # Errors
    ///
    /// `NoBalance` when nothing is due.
    pub async fn withdraw(&self, caller: Address) -> Result<TicketReceipt, TicketError> {
        self.store.send(TicketAction::Withdraw { caller }).await
    }

    /// Pays out the owner's revenue
    ///
    /// # Errors
    ///
    /// `NotOwner`, `InvalidStage` (not Closed), `AlreadyWithdrawn` or
    /// `NoBalance`.
    pub async fn owner_withdraw(&self, caller: Address) -> Result<TicketReceipt, TicketError> {
        self.store.send(TicketAction::OwnerWithdraw { caller }).await
    }

    // ========== Fixed properties ==========

    /// The event's address
    #[must_use]
    pub fn address(&self) -> Address {
        self.info.address
    }

    /// The event owner
    #[must_use]
    pub fn owner(&self) -> Address {
        self.info.owner
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Display symbol
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.info.symbol
    }

    /// Primary sale price
    #[must_use]
    pub fn price(&self) -> Amount {
        self.info.price
    }

    /// Total supply
    #[must_use]
    pub fn num_tickets_total(&self) -> u32 {
        self.info.num_tickets_total
    }

    /// Whether holders may resell
    #[must_use]
    pub fn can_be_resold(&self) -> bool {
        self.info.can_be_resold
    }

    /// Owner's share of each resale
    #[must_use]
    pub fn royalty_percent(&self) -> u8 {
        self.info.royalty_percent
    }

    // ========== Queries ==========

    /// Current stage
    pub async fn stage(&self) -> Stage {
        self.store.state(|s| s.stage).await
    }

    /// Unsold primary inventory
    pub async fn num_tickets_left(&self) -> u32 {
        self.store.state(|s| s.num_tickets_left).await
    }

    /// Number of tickets held by `address`
    pub async fn balance_of(&self, address: Address) -> usize {
        self.store.state(|s| s.balance_of(address)).await
    }

    /// Pending withdrawal for `address`, the owner revenue included for the owner
    pub async fn balances(&self, address: Address) -> Amount {
        self.store.state(|s| s.pending_balance(address)).await
    }

    /// Holder of a ticket
    pub async fn owner_of(&self, ticket_id: TicketId) -> Option<Address> {
        self.store.state(|s| s.owner_of(ticket_id)).await
    }

    /// Status of a ticket
    pub async fn ticket_status(&self, ticket_id: TicketId) -> Option<TicketStatus> {
        self.store.state(|s| s.ticket_status(ticket_id)).await
    }

    /// Buyer registered for a ticket, if any
    pub async fn registered_buyer(&self, ticket_id: TicketId) -> Option<Address> {
        self.store
            .state(|s| s.ticket(ticket_id).and_then(|t| t.registered_buyer))
            .await
    }

    /// Buyer approved for a ticket, if any
    pub async fn approved_buyer(&self, ticket_id: TicketId) -> Option<Address> {
        self.store
            .state(|s| s.ticket(ticket_id).and_then(|t| t.approved_buyer))
            .await
    }

    /// A single ticket record
    pub async fn ticket(&self, ticket_id: TicketId) -> Option<Ticket> {
        self.store.state(|s| s.ticket(ticket_id).cloned()).await
    }

    /// Every issued ticket in id order
    pub async fn tickets_created(&self) -> Vec<(TicketId, Ticket)> {
        self.store
            .state(|s| s.issued().map(|(id, t)| (id, t.clone())).collect())
            .await
    }

    /// Ids of tickets currently listed for resale
    pub async fn tickets_for_sale(&self) -> Vec<TicketId> {
        self.store.state(EventState::tickets_for_sale).await
    }

    /// Value currently held by the event
    pub async fn escrow(&self) -> Amount {
        self.store.state(|s| s.escrow).await
    }

    /// Whether the owner's revenue has been paid out
    pub async fn owner_revenue_withdrawn(&self) -> bool {
        self.store.state(|s| s.owner_revenue_withdrawn).await
    }

    /// Copy of the full ledger state
    pub async fn snapshot(&self) -> EventState {
        self.store.state(EventState::clone).await
    }

    // ========== Lifecycle ==========

    /// Subscribes to notifications committed after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TicketNotification> {
        self.store.subscribe()
    }

    /// Number of payouts still in flight
    #[must_use]
    pub fn pending_payouts(&self) -> usize {
        self.store.pending_effects()
    }

    /// Stops accepting operations and waits for in-flight payouts
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownTimeout`] when payouts are still running.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}

impl std::fmt::Debug for TicketEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketEvent")
            .field("address", &self.info.address)
            .field("name", &self.info.name)
            .field("owner", &self.info.owner)
            .finish_non_exhaustive()
    }
}
