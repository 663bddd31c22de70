//! HTTP handlers for the ticket index and the gate check.
//!
//! JSON field names follow the web client: requests send `ticketId`, ticket
//! listings answer with `ticketID`.

use crate::error::ApiError;
use crate::records::{RecordStore, TicketRecord, TicketRef, UsedTicketRecord};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

const MISSING_TICKET_FIELDS: &str =
    "No contractAddress, eventName, userAddress or ticketId parameters.";
const MISSING_USED_TICKET_FIELDS: &str =
    "No contractAddress, ticketId, eventName or qrCode parameters.";
const MISSING_USER_ADDRESS: &str = "No userAddress parameter.";

// ============================================================================
// Request and response bodies
// ============================================================================

/// Body of `POST /ticket/add` and `PUT /ticket/update`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketBody {
    /// Event address
    pub contract_address: Option<String>,
    /// Event name
    pub event_name: Option<String>,
    /// Holder
    pub user_address: Option<String>,
    /// Ticket id
    pub ticket_id: Option<TicketRef>,
}

impl TicketBody {
    fn into_record(self) -> Result<TicketRecord, ApiError> {
        match (
            self.contract_address,
            self.event_name,
            self.user_address,
            self.ticket_id,
        ) {
            (Some(contract_address), Some(event_name), Some(user_address), Some(ticket_id)) => {
                Ok(TicketRecord {
                    contract_address,
                    event_name,
                    user_address,
                    ticket_id,
                })
            },
            _ => Err(ApiError::bad_request(MISSING_TICKET_FIELDS)),
        }
    }
}

/// Body of `POST /usedTicket/add`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedTicketBody {
    /// Holder presenting the ticket
    pub user_address: Option<String>,
    /// Event address
    pub contract_address: Option<String>,
    /// Ticket id
    pub ticket_id: Option<TicketRef>,
    /// Event name
    pub event_name: Option<String>,
    /// QR code scanned at the gate
    pub qr_code: Option<String>,
}

/// Query of `GET /ticket/query`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQuery {
    /// Holder to list tickets for
    pub user_address: Option<String>,
    /// Accepted for client compatibility; listings are not narrowed by it
    pub event_name: Option<String>,
}

/// Query of `GET /usedTicket/query`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedTicketQuery {
    /// Holder
    pub user_address: Option<String>,
    /// Event name to verify
    pub event_name: Option<String>,
    /// QR code to verify
    pub qr_code: Option<String>,
}

/// Indexed ticket as listed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    /// Event address
    pub contract_address: String,
    /// Event name
    pub event_name: String,
    /// Holder
    pub user_address: String,
    /// Ticket id
    #[serde(rename = "ticketID")]
    pub ticket_id: TicketRef,
}

impl From<TicketRecord> for TicketView {
    fn from(record: TicketRecord) -> Self {
        Self {
            contract_address: record.contract_address,
            event_name: record.event_name,
            user_address: record.user_address,
            ticket_id: record.ticket_id,
        }
    }
}

/// Check-in as listed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedTicketView {
    /// Event name
    pub event_name: String,
    /// QR code presented
    pub qr_code: String,
    /// Holder
    pub user_address: String,
}

impl From<UsedTicketRecord> for UsedTicketView {
    fn from(record: UsedTicketRecord) -> Self {
        Self {
            event_name: record.event_name,
            qr_code: record.qr_code,
            user_address: record.user_address,
        }
    }
}

/// Acknowledgement of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Success {
    /// Always `"success"`
    pub result: &'static str,
}

const SUCCESS: Success = Success { result: "success" };

/// Answer of `GET /usedTicket/query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UsedTicketAnswer {
    /// Every check-in of the user (no event or QR code given)
    CheckIns(Vec<UsedTicketView>),
    /// Whether the given check-in exists
    Verdict {
        /// `true` when the user checked in with that code
        result: bool,
    },
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /ticket/add`: index a ticket
///
/// # Errors
///
/// 400 when a field is missing or the body is not JSON.
pub async fn add_ticket(
    State(records): State<RecordStore>,
    body: Result<Json<TicketBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Success>), ApiError> {
    let Json(body) = body?;
    let record = body.into_record()?;

    tracing::info!(
        contract = %record.contract_address,
        user = %record.user_address,
        ticket = %record.ticket_id,
        "Ticket indexed"
    );
    records.add_ticket(record).await;

    Ok((StatusCode::CREATED, Json(SUCCESS)))
}

/// `GET /ticket/query`: tickets held by a user
///
/// # Errors
///
/// 400 when `userAddress` is missing.
pub async fn query_tickets(
    State(records): State<RecordStore>,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<TicketView>>, ApiError> {
    let user_address = query
        .user_address
        .ok_or_else(|| ApiError::bad_request(MISSING_USER_ADDRESS))?;

    let tickets = records
        .tickets_for(&user_address)
        .await
        .into_iter()
        .map(TicketView::from)
        .collect();

    Ok(Json(tickets))
}

/// `PUT /ticket/update`: move an indexed ticket to a new holder
///
/// Succeeds even when the ticket is not indexed.
///
/// # Errors
///
/// 400 when a field is missing or the body is not JSON.
pub async fn update_ticket(
    State(records): State<RecordStore>,
    body: Result<Json<TicketBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Success>), ApiError> {
    let Json(body) = body?;
    let record = body.into_record()?;

    let updated = records
        .reassign(
            &record.contract_address,
            &record.ticket_id,
            &record.user_address,
        )
        .await;

    if updated {
        tracing::info!(
            contract = %record.contract_address,
            user = %record.user_address,
            ticket = %record.ticket_id,
            "Ticket holder updated"
        );
    } else {
        tracing::warn!(
            contract = %record.contract_address,
            ticket = %record.ticket_id,
            "Update for a ticket that is not indexed"
        );
    }

    Ok((StatusCode::CREATED, Json(SUCCESS)))
}

/// `POST /usedTicket/add`: log a check-in and drop the ticket from the index
///
/// # Errors
///
/// 400 when a field is missing or the body is not JSON.
pub async fn add_used_ticket(
    State(records): State<RecordStore>,
    body: Result<Json<UsedTicketBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Success>), ApiError> {
    let Json(body) = body?;
    let (
        Some(user_address),
        Some(contract_address),
        Some(ticket_id),
        Some(event_name),
        Some(qr_code),
    ) = (
        body.user_address,
        body.contract_address,
        body.ticket_id,
        body.event_name,
        body.qr_code,
    )
    else {
        return Err(ApiError::bad_request(MISSING_USED_TICKET_FIELDS));
    };

    let removed = records
        .check_in(
            &contract_address,
            &ticket_id,
            UsedTicketRecord {
                user_address,
                event_name,
                qr_code,
            },
        )
        .await;

    metrics::counter!("ticketchain.verifier.checkins").increment(1);
    tracing::info!(
        contract = %contract_address,
        ticket = %ticket_id,
        removed,
        "Check-in recorded"
    );

    Ok((StatusCode::CREATED, Json(SUCCESS)))
}

/// `GET /usedTicket/query`: list or verify check-ins
///
/// With only `userAddress`, lists the user's check-ins. With `eventName`
/// or `qrCode` as well, answers whether that exact check-in exists; a
/// missing half never matches.
///
/// # Errors
///
/// 400 when `userAddress` is missing.
pub async fn query_used_tickets(
    State(records): State<RecordStore>,
    Query(query): Query<UsedTicketQuery>,
) -> Result<Json<UsedTicketAnswer>, ApiError> {
    let user_address = query
        .user_address
        .ok_or_else(|| ApiError::bad_request(MISSING_USER_ADDRESS))?;

    let answer = match (query.event_name, query.qr_code) {
        (None, None) => UsedTicketAnswer::CheckIns(
            records
                .used_by(&user_address)
                .await
                .into_iter()
                .map(UsedTicketView::from)
                .collect(),
        ),
        (Some(event_name), Some(qr_code)) => UsedTicketAnswer::Verdict {
            result: records
                .is_checked_in(&user_address, &event_name, &qr_code)
                .await,
        },
        _ => UsedTicketAnswer::Verdict { result: false },
    };

    Ok(Json(answer))
}

/// `GET /resetDatabase`: drop every record
pub async fn reset_database(State(records): State<RecordStore>) -> (StatusCode, &'static str) {
    records.reset().await;
    tracing::warn!("All ticket and check-in records removed");
    (StatusCode::OK, "Database cleaned")
}
