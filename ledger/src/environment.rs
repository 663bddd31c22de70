//! Injected dependencies for the ticket ledger.
//!
//! Value leaves the ledger only through [`Payout`]. The ledger zeroes the
//! balance before it asks for the transfer; a failed transfer is reported
//! back and the amount is re-credited.

use crate::types::{Address, Amount};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use ticketchain_core::environment::{Clock, SystemClock};
use tokio::sync::Mutex;

/// Why a payout did not go through
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayoutError {
    /// The receiving side refused the transfer
    #[error("Payout rejected: {0}")]
    Rejected(String),

    /// The transfer could not be attempted
    #[error("Payout unavailable: {0}")]
    Unavailable(String),
}

/// Transfers value out of the ledger to an identity.
///
/// Implementations return boxed futures; the ledger holds it as `Arc<dyn Payout>`.
pub trait Payout: Send + Sync {
    /// Transfer `amount` to `to`
    ///
    /// # Errors
    ///
    /// Returns [`PayoutError`] when the value was not transferred.
    fn transfer(
        &self,
        to: Address,
        amount: Amount,
    ) -> Pin<Box<dyn Future<Output = Result<(), PayoutError>> + Send + '_>>;
}

/// A completed transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// Recipient
    pub to: Address,
    /// Transferred amount
    pub amount: Amount,
}

/// Payout target that keeps received funds in memory.
///
/// Stands in for the execution environment's accounts.
#[derive(Clone, Debug, Default)]
pub struct InMemoryWallets {
    transfers: Arc<Mutex<Vec<Transfer>>>,
}

impl InMemoryWallets {
    /// Creates empty wallets
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total received by `address`
    pub async fn received(&self, address: Address) -> Amount {
        self.transfers
            .lock()
            .await
            .iter()
            .filter(|transfer| transfer.to == address)
            .fold(Amount::ZERO, |total, transfer| total + transfer.amount)
    }

    /// Every transfer in completion order
    pub async fn transfers(&self) -> Vec<Transfer> {
        self.transfers.lock().await.clone()
    }

    /// Totals per recipient
    pub async fn totals(&self) -> HashMap<Address, Amount> {
        let mut totals = HashMap::new();
        for transfer in self.transfers.lock().await.iter() {
            *totals.entry(transfer.to).or_insert(Amount::ZERO) += transfer.amount;
        }
        totals
    }
}

impl Payout for InMemoryWallets {
    fn transfer(
        &self,
        to: Address,
        amount: Amount,
    ) -> Pin<Box<dyn Future<Output = Result<(), PayoutError>> + Send + '_>> {
        Box::pin(async move {
            self.transfers.lock().await.push(Transfer { to, amount });
            Ok(())
        })
    }
}

/// Environment dependencies for the ticket event reducer
#[derive(Clone)]
pub struct TicketEnvironment {
    /// Clock for issue and check-in timestamps
    pub clock: Arc<dyn Clock>,
    /// Where withdrawals are sent
    pub payout: Arc<dyn Payout>,
}

impl TicketEnvironment {
    /// Creates a new `TicketEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, payout: Arc<dyn Payout>) -> Self {
        Self { clock, payout }
    }

    /// System clock with the given payout target
    #[must_use]
    pub fn with_payout(payout: Arc<dyn Payout>) -> Self {
        Self::new(Arc::new(SystemClock), payout)
    }
}

impl std::fmt::Debug for TicketEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketEnvironment").finish_non_exhaustive()
    }
}
