//! # Ticketchain Verifier
//!
//! HTTP backend for the ticket index and gate check-ins.
//!
//! The service keeps two record sets in a [`RecordStore`]: which user holds
//! which ticket, and which user checked in with which QR code. Records arrive
//! either from clients over HTTP (see [`routes::build_router`]) or straight
//! from a ticket event through a [`NotificationRelay`] the embedding process
//! starts when it creates the event.

pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod records;
pub mod relay;
pub mod routes;

pub use config::{Config, ConfigError, ServerConfig};
pub use error::ApiError;
pub use records::{RecordStore, TicketRecord, TicketRef, UsedTicketRecord};
pub use relay::NotificationRelay;
pub use routes::build_router;
