//! Domain types for the ticket ledger.
//!
//! - Identities (`Address`) for callers and event instances
//! - Value (`Amount`) in integer base units
//! - The event lifecycle (`Stage`) and per-ticket records (`Ticket`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub, SubAssign};
use thiserror::Error;
use uuid::Uuid;

/// Identity of a caller, a ticket holder, or an event instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(Uuid);

impl Address {
    /// Creates a new random `Address`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an `Address` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Value in integer base units (no fractional amounts)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Amount(u128);

impl Amount {
    /// Zero value
    pub const ZERO: Self = Self(0);

    /// Creates an `Amount` from base units
    #[must_use]
    pub const fn from_units(units: u128) -> Self {
        Self(units)
    }

    /// Returns the amount in base units
    #[must_use]
    pub const fn units(&self) -> u128 {
        self.0
    }

    /// Checks if this amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Addition that reports overflow instead of wrapping
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(units) => Some(Self(units)),
            None => None,
        }
    }

    /// Subtraction that reports underflow instead of wrapping
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(units) => Some(Self(units)),
            None => None,
        }
    }

    /// `self * percent / 100`, truncating
    ///
    /// Split as `100q + m` so the product never overflows.
    #[must_use]
    pub const fn percent(self, percent: u8) -> Self {
        let percent = percent as u128;
        let whole = self.0 / 100;
        let rest = self.0 % 100;
        Self(whole * percent + rest * percent / 100)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential ticket identifier, assigned from 0 at primary sale
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketId(u32);

impl TicketId {
    /// Creates a `TicketId` from its index
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the index
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event lifecycle stage
///
/// The numeric values are part of the external interface (`setStage` takes
/// the integer form).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Stage {
    /// Created, nothing on sale yet
    Prep = 0,
    /// Primary and secondary sales open
    Active = 1,
    /// Sales halted temporarily
    Paused = 2,
    /// Ticket holders may check in
    CheckinOpen = 3,
    /// Event called off; face value refundable
    Cancelled = 4,
    /// Event over; owner may withdraw revenue
    Closed = 5,
}

impl Stage {
    /// All stages in numeric order
    pub const ALL: [Self; 6] = [
        Self::Prep,
        Self::Active,
        Self::Paused,
        Self::CheckinOpen,
        Self::Cancelled,
        Self::Closed,
    ];

    /// Numeric form
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Prep => "Prep",
            Self::Active => "Active",
            Self::Paused => "Paused",
            Self::CheckinOpen => "CheckinOpen",
            Self::Cancelled => "Cancelled",
            Self::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// A stage number outside `0..=5`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unknown stage value {0}")]
pub struct UnknownStage(pub u8);

impl TryFrom<u8> for Stage {
    type Error = UnknownStage;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_u8() == value)
            .ok_or(UnknownStage(value))
    }
}

/// Ticket status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TicketStatus {
    /// Held by a user
    Owned = 0,
    /// Checked in; terminal
    Used = 1,
    /// Listed on the secondary market
    ForSale = 2,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Owned => "Owned",
            Self::Used => "Used",
            Self::ForSale => "ForSale",
        };
        f.write_str(name)
    }
}

/// A single issued ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Current holder
    pub owner: Address,
    /// Current status
    pub status: TicketStatus,
    /// Asking price, meaningful only while `ForSale`
    pub resale_price: Amount,
    /// Buyer the holder authorized to purchase (single slot)
    pub approved_buyer: Option<Address>,
    /// Prospective buyer that asked to purchase (single slot, informational)
    pub registered_buyer: Option<Address>,
    /// When the ticket was sold on the primary market
    pub issued_at: DateTime<Utc>,
    /// When the holder checked in
    pub used_at: Option<DateTime<Utc>>,
    /// Face value returned to the holder after cancellation; the ticket is void
    pub refunded: bool,
}

impl Ticket {
    /// Creates a freshly issued ticket
    #[must_use]
    pub const fn issue(owner: Address, issued_at: DateTime<Utc>) -> Self {
        Self {
            owner,
            status: TicketStatus::Owned,
            resale_price: Amount::ZERO,
            approved_buyer: None,
            registered_buyer: None,
            issued_at,
            used_at: None,
            refunded: false,
        }
    }

    /// Drops any listing, approval and registration
    pub(crate) fn clear_listing(&mut self) {
        self.resale_price = Amount::ZERO;
        self.approved_buyer = None;
        self.registered_buyer = None;
    }
}

/// Construction parameters for a ticket event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParams {
    /// Total supply
    pub num_tickets: u32,
    /// Primary sale price per ticket
    pub price: Amount,
    /// Whether holders may list tickets on the secondary market
    pub can_be_resold: bool,
    /// Share of each resale price paid to the event owner, 0–100
    pub royalty_percent: u8,
    /// Display name
    pub name: String,
    /// Display symbol
    pub symbol: String,
    /// Explicit owner; defaults to the creator
    pub owner: Option<Address>,
}

impl EventParams {
    /// Parameters owned by whoever deploys them
    #[must_use]
    pub fn new(
        num_tickets: u32,
        price: Amount,
        can_be_resold: bool,
        royalty_percent: u8,
        name: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            num_tickets,
            price,
            can_be_resold,
            royalty_percent,
            name: name.into(),
            symbol: symbol.into(),
            owner: None,
        }
    }

    /// Names an explicit owner
    #[must_use]
    pub fn with_owner(mut self, owner: Address) -> Self {
        self.owner = Some(owner);
        self
    }
}
