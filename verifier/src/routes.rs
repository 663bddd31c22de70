//! Router for the verifier service.

use crate::api;
use crate::health::health_check;
use crate::records::RecordStore;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete router over `records`
///
/// The browser client calls the API cross-origin, so CORS is open. The
/// check-in routes answer under both `usedTicket` and `usedticket`.
pub fn build_router(records: RecordStore) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Ticket index
        .route("/ticket/add", post(api::add_ticket))
        .route("/ticket/query", get(api::query_tickets))
        .route("/ticket/update", put(api::update_ticket))
        // Check-ins
        .route("/usedTicket/add", post(api::add_used_ticket))
        .route("/usedticket/add", post(api::add_used_ticket))
        .route("/usedTicket/query", get(api::query_used_tickets))
        .route("/usedticket/query", get(api::query_used_tickets))
        .route("/resetDatabase", get(api::reset_database))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(records)
}
