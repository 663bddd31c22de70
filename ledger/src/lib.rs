//! # Ticketchain Ledger
//!
//! Event tickets as uniquely owned tokens tied to a single event.
//!
//! A [`TicketEvent`] issues tickets for a fixed price, lets holders resell
//! them to a buyer they approve (paying the event owner a royalty), checks
//! tickets in at the gate, and escrows every payment until the entitled
//! party withdraws it. Which operations are legal depends on the event's
//! [`Stage`]:
//!
//! | Operation | Allowed stages |
//! |---|---|
//! | `buy_ticket` | Active |
//! | `set_ticket_for_sale`, `register_as_buyer`, `buy_ticket_from_user` | Active |
//! | `set_ticket_to_used` | `CheckinOpen` |
//! | `approve_as_buyer`, `withdraw` | any |
//! | `owner_withdraw` | Closed, once |
//! | `set_stage` | any (owner only) |
//!
//! The [`EventRegistry`] creates events on behalf of their creators and
//! lists them in creation order.
//!
//! ## Example
//!
//! ```ignore
//! use ticketchain_ledger::{Address, Amount, EventParams, EventRegistry, Stage};
//!
//! let registry = EventRegistry::new(env);
//! let owner = Address::new();
//! let event = registry
//!     .create_event(owner, EventParams::new(500, Amount::from_units(200), true, 20, "Gig", "GIG"))
//!     .await?;
//!
//! event.set_stage(owner, Stage::Active).await?;
//! event.buy_ticket(fan, Amount::from_units(200)).await?;
//! ```

pub mod environment;
pub mod error;
pub mod event;
pub mod notification;
pub mod reducer;
pub mod registry;
pub mod state;
pub mod types;

pub use environment::{InMemoryWallets, Payout, PayoutError, TicketEnvironment, Transfer};
pub use error::{ConstructionError, TicketError};
pub use event::{TicketEvent, TicketReceipt};
pub use notification::{RegistryNotification, TicketNotification};
pub use reducer::{TicketAction, TicketReducer};
pub use registry::EventRegistry;
pub use state::EventState;
pub use types::{
    Address, Amount, EventParams, Stage, Ticket, TicketId, TicketStatus, UnknownStage,
};
