//! Ticket event reducer.
//!
//! Every external call on a ticket event is a [`TicketAction`]. The reducer
//! checks stage, ownership and payment against the settled state first and
//! only then mutates it, so a rejected action leaves the ledger untouched.
//!
//! Value accounting: every accepted payment is added to `escrow` and fully
//! credited. Face value and royalties go to the owner revenue, which only
//! `ownerWithdraw` pays out and which funds cancellation refunds. Seller
//! proceeds, buyer excess and refunds go to the payer's pending balance,
//! which `withdraw` pays out to anyone, the owner included. Withdrawals zero
//! the amount and debit `escrow` in the same commit, then hand the transfer
//! to the [`Payout`](crate::environment::Payout) as an effect. A failed
//! transfer feeds back [`TicketAction::PayoutFailed`].

use crate::environment::TicketEnvironment;
use crate::error::TicketError;
use crate::notification::TicketNotification;
use crate::state::EventState;
use crate::types::{Address, Amount, Stage, Ticket, TicketId, TicketStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ticketchain_core::effect::{Effect, Outcome};
use ticketchain_core::reducer::Reducer;

// ============================================================================
// Actions
// ============================================================================

/// Inputs accepted by a ticket event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketAction {
    /// Owner moves the event to `stage`
    SetStage {
        /// Originating identity
        caller: Address,
        /// Target stage
        stage: Stage,
    },

    /// Primary purchase of the next ticket
    BuyTicket {
        /// Buyer
        caller: Address,
        /// Value sent with the call
        payment: Amount,
    },

    /// Holder checks in at the gate
    SetTicketToUsed {
        /// Holder
        caller: Address,
        /// Ticket to redeem
        ticket_id: TicketId,
        /// Redemption key forwarded to the verification backend
        qr_code_key: String,
    },

    /// Holder lists a ticket for resale
    SetTicketForSale {
        /// Holder
        caller: Address,
        /// Ticket to list
        ticket_id: TicketId,
        /// Asking price
        resale_price: Amount,
    },

    /// Holder authorizes `buyer` to purchase a ticket
    ApproveAsBuyer {
        /// Holder
        caller: Address,
        /// Authorized buyer
        buyer: Address,
        /// Ticket
        ticket_id: TicketId,
    },

    /// Prospective buyer asks to purchase a listed ticket
    RegisterAsBuyer {
        /// Prospective buyer
        caller: Address,
        /// Listed ticket
        ticket_id: TicketId,
    },

    /// Approved buyer purchases a listed ticket
    BuyTicketFromUser {
        /// Buyer
        caller: Address,
        /// Listed ticket
        ticket_id: TicketId,
        /// Value sent with the call
        payment: Amount,
    },

    /// Pay out the caller's pending balance
    Withdraw {
        /// Recipient
        caller: Address,
    },

    /// Pay out the owner's revenue once the event is closed
    OwnerWithdraw {
        /// Event owner
        caller: Address,
    },

    /// A payout effect failed; restore the balance it debited
    ///
    /// Produced only by payout effects.
    PayoutFailed {
        /// Intended recipient
        receiver: Address,
        /// Amount that did not leave the ledger
        amount: Amount,
        /// Whether this was the owner revenue withdrawal
        owner_revenue: bool,
        /// Payout error message
        reason: String,
    },
}

impl TicketAction {
    /// Operation name as exposed by the event interface
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::SetStage { .. } => "setStage",
            Self::BuyTicket { .. } => "buyTicket",
            Self::SetTicketToUsed { .. } => "setTicketToUsed",
            Self::SetTicketForSale { .. } => "setTicketForSale",
            Self::ApproveAsBuyer { .. } => "approveAsBuyer",
            Self::RegisterAsBuyer { .. } => "registerAsBuyer",
            Self::BuyTicketFromUser { .. } => "buyTicketFromUser",
            Self::Withdraw { .. } => "withdraw",
            Self::OwnerWithdraw { .. } => "ownerWithdraw",
            Self::PayoutFailed { .. } => "payoutFailed",
        }
    }
}

type TicketOutcome = Outcome<TicketAction, TicketNotification>;

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for a single ticket event
#[derive(Clone, Copy, Debug, Default)]
pub struct TicketReducer;

impl TicketReducer {
    /// Creates a new `TicketReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    // ========== Validation ==========

    fn require_stage(
        state: &EventState,
        operation: &'static str,
        allowed: Stage,
    ) -> Result<(), TicketError> {
        if state.stage == allowed {
            Ok(())
        } else {
            Err(TicketError::invalid_stage(operation, state.stage))
        }
    }

    fn existing_ticket(state: &EventState, ticket_id: TicketId) -> Result<&Ticket, TicketError> {
        state
            .ticket(ticket_id)
            .ok_or(TicketError::UnknownTicket { ticket_id })
    }

    fn held_ticket(
        state: &EventState,
        caller: Address,
        ticket_id: TicketId,
    ) -> Result<&Ticket, TicketError> {
        let ticket = Self::existing_ticket(state, ticket_id)?;
        if ticket.owner != caller {
            return Err(TicketError::NotTicketOwner { ticket_id });
        }
        Ok(ticket)
    }

    const fn invalid_ticket_state(ticket_id: TicketId, ticket: &Ticket) -> TicketError {
        TicketError::InvalidTicketState {
            ticket_id,
            status: ticket.status,
            refunded: ticket.refunded,
        }
    }

    fn accept_payment(
        state: &EventState,
        required: Amount,
        payment: Amount,
    ) -> Result<(), TicketError> {
        if payment < required {
            return Err(TicketError::InsufficientPayment {
                required,
                offered: payment,
            });
        }

        // Balances never exceed escrow, so this one check covers every credit
        if state.escrow.checked_add(payment).is_none() {
            return Err(TicketError::EscrowOverflow);
        }

        Ok(())
    }

    fn validate_set_stage(state: &EventState, caller: Address) -> Result<(), TicketError> {
        if caller != state.owner {
            return Err(TicketError::NotOwner);
        }
        Ok(())
    }

    fn validate_buy_ticket(state: &EventState, payment: Amount) -> Result<(), TicketError> {
        Self::require_stage(state, "buyTicket", Stage::Active)?;

        if state.num_tickets_left == 0 {
            return Err(TicketError::SoldOut);
        }

        Self::accept_payment(state, state.ticket_price, payment)
    }

    fn validate_set_ticket_to_used(
        state: &EventState,
        caller: Address,
        ticket_id: TicketId,
    ) -> Result<(), TicketError> {
        Self::require_stage(state, "setTicketToUsed", Stage::CheckinOpen)?;

        let ticket = Self::held_ticket(state, caller, ticket_id)?;
        if ticket.status == TicketStatus::Used {
            return Err(TicketError::AlreadyUsed { ticket_id });
        }
        if ticket.refunded {
            return Err(Self::invalid_ticket_state(ticket_id, ticket));
        }

        Ok(())
    }

    fn validate_set_ticket_for_sale(
        state: &EventState,
        caller: Address,
        ticket_id: TicketId,
    ) -> Result<(), TicketError> {
        Self::require_stage(state, "setTicketForSale", Stage::Active)?;

        if !state.can_be_resold {
            return Err(TicketError::ResaleDisabled);
        }

        let ticket = Self::held_ticket(state, caller, ticket_id)?;
        if ticket.status != TicketStatus::Owned || ticket.refunded {
            return Err(Self::invalid_ticket_state(ticket_id, ticket));
        }

        Ok(())
    }

    fn validate_approve_as_buyer(
        state: &EventState,
        caller: Address,
        ticket_id: TicketId,
    ) -> Result<(), TicketError> {
        Self::held_ticket(state, caller, ticket_id).map(|_| ())
    }

    fn validate_register_as_buyer(
        state: &EventState,
        caller: Address,
        ticket_id: TicketId,
    ) -> Result<(), TicketError> {
        Self::require_stage(state, "registerAsBuyer", Stage::Active)?;

        let ticket = Self::existing_ticket(state, ticket_id)?;
        if ticket.status != TicketStatus::ForSale {
            return Err(TicketError::TicketNotForSale { ticket_id });
        }
        if ticket.owner == caller {
            return Err(Self::invalid_ticket_state(ticket_id, ticket));
        }

        Ok(())
    }

    fn validate_buy_ticket_from_user(
        state: &EventState,
        caller: Address,
        ticket_id: TicketId,
        payment: Amount,
    ) -> Result<(), TicketError> {
        Self::require_stage(state, "buyTicketFromUser", Stage::Active)?;

        let ticket = Self::existing_ticket(state, ticket_id)?;
        if ticket.status != TicketStatus::ForSale {
            return Err(TicketError::TicketNotForSale { ticket_id });
        }
        if ticket.approved_buyer != Some(caller) {
            return Err(TicketError::NotApprovedBuyer { ticket_id });
        }

        Self::accept_payment(state, ticket.resale_price, payment)
    }

    fn validate_withdraw(state: &EventState, caller: Address) -> Result<(), TicketError> {
        if state.withdrawable(caller).is_zero() {
            return Err(TicketError::NoBalance);
        }
        Ok(())
    }

    fn validate_owner_withdraw(state: &EventState, caller: Address) -> Result<(), TicketError> {
        if caller != state.owner {
            return Err(TicketError::NotOwner);
        }

        Self::require_stage(state, "ownerWithdraw", Stage::Closed)?;

        if state.owner_revenue_withdrawn {
            return Err(TicketError::AlreadyWithdrawn);
        }
        if state.owner_revenue.is_zero() {
            return Err(TicketError::NoBalance);
        }

        Ok(())
    }

    // ========== Apply ==========

    /// Ticket the preceding validation found
    ///
    /// Validation runs against the same state under the same lock, so the
    /// ticket is always there.
    fn validated_ticket(state: &mut EventState, ticket_id: TicketId) -> Option<&mut Ticket> {
        let ticket = state.ticket_mut(ticket_id);
        debug_assert!(ticket.is_some(), "validated ticket {ticket_id} is missing");
        ticket
    }

    fn apply_set_stage(state: &mut EventState, stage: Stage) -> TicketOutcome {
        let from = state.stage;
        state.stage = stage;

        tracing::info!(event = %state.address, %from, to = %stage, "Stage changed");
        let mut outcome = Outcome::notify(TicketNotification::StageChanged { from, to: stage });

        if stage == Stage::Cancelled {
            outcome.notifications.extend(Self::issue_refunds(state));
        }

        outcome
    }

    /// Moves face value from the owner revenue to the holder of every
    /// unused ticket not refunded yet
    ///
    /// Newest tickets are funded first. Tickets the remaining revenue cannot
    /// cover stay unrefunded.
    fn issue_refunds(state: &mut EventState) -> Vec<TicketNotification> {
        let price = state.ticket_price;
        let mut pending: Vec<TicketId> = state
            .issued()
            .filter(|(_, ticket)| ticket.status != TicketStatus::Used && !ticket.refunded)
            .map(|(ticket_id, _)| ticket_id)
            .collect();

        let mut funded = Vec::with_capacity(pending.len());
        while state.owner_revenue >= price {
            let Some(ticket_id) = pending.pop() else {
                break;
            };
            state.owner_revenue -= price;
            funded.push(ticket_id);
        }

        if !pending.is_empty() {
            tracing::warn!(
                event = %state.address,
                unfunded = pending.len(),
                revenue = %state.owner_revenue,
                "Owner revenue does not cover every cancellation refund"
            );
        }

        let mut refunds = Vec::with_capacity(funded.len());
        for ticket_id in funded.into_iter().rev() {
            let Some(ticket) = Self::validated_ticket(state, ticket_id) else {
                state.owner_revenue += price;
                continue;
            };
            ticket.status = TicketStatus::Owned;
            ticket.clear_listing();
            ticket.refunded = true;
            let holder = ticket.owner;

            state.credit(holder, price);
            refunds.push(TicketNotification::RefundIssued {
                holder,
                ticket_id,
                money: price,
            });
        }

        tracing::info!(event = %state.address, refunds = refunds.len(), "Cancellation refunds issued");
        refunds
    }

    fn apply_buy_ticket(
        state: &mut EventState,
        caller: Address,
        payment: Amount,
        env: &TicketEnvironment,
    ) -> TicketOutcome {
        let ticket_id = state.next_ticket_id();
        let price = state.ticket_price;

        state.tickets.push(Ticket::issue(caller, env.clock.now()));
        state.num_tickets_left -= 1;
        state.escrow += payment;
        state.owner_revenue += price;
        state.credit(caller, payment - price);

        tracing::info!(
            event = %state.address,
            %ticket_id,
            buyer = %caller,
            %payment,
            "Ticket purchased"
        );

        Outcome::notify(TicketNotification::CreateTicket {
            buyer: caller,
            ticket_id,
        })
    }

    fn apply_set_ticket_to_used(
        state: &mut EventState,
        ticket_id: TicketId,
        qr_code_key: String,
        env: &TicketEnvironment,
    ) -> TicketOutcome {
        let contract_address = state.address;
        let event_name = state.name.clone();

        if let Some(ticket) = Self::validated_ticket(state, ticket_id) {
            ticket.status = TicketStatus::Used;
            ticket.used_at = Some(env.clock.now());
            ticket.clear_listing();
        }

        tracing::info!(event = %contract_address, %ticket_id, "Ticket checked in");

        Outcome::notify(TicketNotification::TicketUsed {
            ticket_id,
            qr_code_key,
            contract_address,
            event_name,
        })
    }

    fn apply_set_ticket_for_sale(
        state: &mut EventState,
        ticket_id: TicketId,
        resale_price: Amount,
    ) -> TicketOutcome {
        if let Some(ticket) = Self::validated_ticket(state, ticket_id) {
            ticket.status = TicketStatus::ForSale;
            ticket.resale_price = resale_price;
        }

        tracing::info!(event = %state.address, %ticket_id, %resale_price, "Ticket listed");
        Outcome::notify(TicketNotification::TicketForSale { ticket_id })
    }

    fn apply_approve_as_buyer(
        state: &mut EventState,
        buyer: Address,
        ticket_id: TicketId,
    ) -> TicketOutcome {
        if let Some(ticket) = Self::validated_ticket(state, ticket_id) {
            ticket.approved_buyer = Some(buyer);
        }

        tracing::info!(event = %state.address, %ticket_id, %buyer, "Buyer approved");
        Outcome::notify(TicketNotification::BuyerApproved { ticket_id, buyer })
    }

    fn apply_register_as_buyer(
        state: &mut EventState,
        buyer: Address,
        ticket_id: TicketId,
    ) -> TicketOutcome {
        if let Some(ticket) = Self::validated_ticket(state, ticket_id) {
            ticket.registered_buyer = Some(buyer);
        }

        tracing::info!(event = %state.address, %ticket_id, %buyer, "Buyer registered");
        Outcome::notify(TicketNotification::BuyerRegistered { ticket_id, buyer })
    }

    fn apply_buy_ticket_from_user(
        state: &mut EventState,
        caller: Address,
        ticket_id: TicketId,
        payment: Amount,
    ) -> TicketOutcome {
        let royalty_percent = state.royalty_percent;
        let Some(ticket) = Self::validated_ticket(state, ticket_id) else {
            return Outcome::new();
        };

        let seller = ticket.owner;
        let price = ticket.resale_price;
        ticket.owner = caller;
        ticket.status = TicketStatus::Owned;
        ticket.clear_listing();

        let royalty = price.percent(royalty_percent);
        state.escrow += payment;
        state.owner_revenue += royalty;
        state.credit(seller, price - royalty);
        state.credit(caller, payment - price);

        tracing::info!(
            event = %state.address,
            %ticket_id,
            %seller,
            buyer = %caller,
            %price,
            %royalty,
            "Ticket resold"
        );

        Outcome::notify(TicketNotification::TicketSold {
            buyer: caller,
            seller,
            ticket_id,
            price,
        })
    }

    fn apply_withdraw(
        state: &mut EventState,
        caller: Address,
        env: &TicketEnvironment,
    ) -> TicketOutcome {
        let money = state.take_balance(caller);
        state.escrow -= money;

        tracing::info!(event = %state.address, receiver = %caller, %money, "Balance withdrawn");

        Outcome::notify(TicketNotification::WithdrawMoney {
            receiver: caller,
            money,
        })
        .with_effect(payout_effect(env, caller, money, false))
    }

    fn apply_owner_withdraw(
        state: &mut EventState,
        caller: Address,
        env: &TicketEnvironment,
    ) -> TicketOutcome {
        let money = state.take_owner_revenue();
        state.escrow -= money;
        state.owner_revenue_withdrawn = true;

        tracing::info!(event = %state.address, owner = %caller, %money, "Owner revenue withdrawn");

        Outcome::notify(TicketNotification::OwnerWithdrawMoney {
            owner: caller,
            money,
        })
        .with_effect(payout_effect(env, caller, money, true))
    }

    fn apply_payout_failed(
        state: &mut EventState,
        receiver: Address,
        amount: Amount,
        owner_revenue: bool,
        reason: &str,
    ) -> Result<TicketOutcome, TicketError> {
        let escrow = state
            .escrow
            .checked_add(amount)
            .ok_or(TicketError::EscrowOverflow)?;

        state.escrow = escrow;
        if owner_revenue {
            state.owner_revenue += amount;
            state.owner_revenue_withdrawn = false;
        } else {
            state.credit(receiver, amount);
        }

        tracing::warn!(
            event = %state.address,
            %receiver,
            %amount,
            reason,
            "Payout failed, balance restored"
        );

        Ok(Outcome::notify(TicketNotification::PayoutReverted {
            receiver,
            money: amount,
        }))
    }
}

/// Transfers `amount` to `receiver`, feeding back `PayoutFailed` on error
fn payout_effect(
    env: &TicketEnvironment,
    receiver: Address,
    amount: Amount,
    owner_revenue: bool,
) -> Effect<TicketAction> {
    let payout = Arc::clone(&env.payout);

    Effect::future(async move {
        match payout.transfer(receiver, amount).await {
            Ok(()) => None,
            Err(error) => {
                tracing::warn!(%receiver, %amount, %error, "Payout failed");
                metrics::counter!("ticketchain.payout.failed").increment(1);
                Some(TicketAction::PayoutFailed {
                    receiver,
                    amount,
                    owner_revenue,
                    reason: error.to_string(),
                })
            },
        }
    })
}

impl Reducer for TicketReducer {
    type State = EventState;
    type Action = TicketAction;
    type Notification = TicketNotification;
    type Error = TicketError;
    type Environment = TicketEnvironment;

    fn reduce(
        &self,
        state: &mut EventState,
        action: TicketAction,
        env: &TicketEnvironment,
    ) -> Result<TicketOutcome, TicketError> {
        match action {
            TicketAction::SetStage { caller, stage } => {
                Self::validate_set_stage(state, caller)?;
                Ok(Self::apply_set_stage(state, stage))
            },

            TicketAction::BuyTicket { caller, payment } => {
                Self::validate_buy_ticket(state, payment)?;
                Ok(Self::apply_buy_ticket(state, caller, payment, env))
            },

            TicketAction::SetTicketToUsed {
                caller,
                ticket_id,
                qr_code_key,
            } => {
                Self::validate_set_ticket_to_used(state, caller, ticket_id)?;
                Ok(Self::apply_set_ticket_to_used(
                    state,
                    ticket_id,
                    qr_code_key,
                    env,
                ))
            },

            TicketAction::SetTicketForSale {
                caller,
                ticket_id,
                resale_price,
            } => {
                Self::validate_set_ticket_for_sale(state, caller, ticket_id)?;
                Ok(Self::apply_set_ticket_for_sale(
                    state,
                    ticket_id,
                    resale_price,
                ))
            },

            TicketAction::ApproveAsBuyer {
                caller,
                buyer,
                ticket_id,
            } => {
                Self::validate_approve_as_buyer(state, caller, ticket_id)?;
                Ok(Self::apply_approve_as_buyer(state, buyer, ticket_id))
            },

            TicketAction::RegisterAsBuyer { caller, ticket_id } => {
                Self::validate_register_as_buyer(state, caller, ticket_id)?;
                Ok(Self::apply_register_as_buyer(state, caller, ticket_id))
            },

            TicketAction::BuyTicketFromUser {
                caller,
                ticket_id,
                payment,
            } => {
                Self::validate_buy_ticket_from_user(state, caller, ticket_id, payment)?;
                Ok(Self::apply_buy_ticket_from_user(
                    state, caller, ticket_id, payment,
                ))
            },

            TicketAction::Withdraw { caller } => {
                Self::validate_withdraw(state, caller)?;
                Ok(Self::apply_withdraw(state, caller, env))
            },

            TicketAction::OwnerWithdraw { caller } => {
                Self::validate_owner_withdraw(state, caller)?;
                Ok(Self::apply_owner_withdraw(state, caller, env))
            },

            TicketAction::PayoutFailed {
                receiver,
                amount,
                owner_revenue,
                reason,
            } => Self::apply_payout_failed(state, receiver, amount, owner_revenue, &reason),
        }
    }
}
