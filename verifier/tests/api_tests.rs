//! HTTP contract of the verifier API.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use ticketchain_verifier::{RecordStore, build_router};
use tower::ServiceExt;

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn call_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = call(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn ticket(contract: &str, user: &str, id: u64) -> Value {
    json!({
        "contractAddress": contract,
        "eventName": "Gig",
        "userAddress": user,
        "ticketId": id,
    })
}

fn app() -> (Router, RecordStore) {
    let records = RecordStore::new();
    (build_router(records.clone()), records)
}

#[tokio::test]
async fn health_reports_version() {
    let (app, _) = app();

    let (status, body) = call_json(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn added_ticket_is_listed_for_its_holder() {
    let (app, _) = app();

    let (status, body) =
        call_json(&app, Method::POST, "/ticket/add", Some(ticket("0xabc", "alice", 3))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"result": "success"}));

    let (status, body) =
        call_json(&app, Method::GET, "/ticket/query?userAddress=alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "contractAddress": "0xabc",
            "eventName": "Gig",
            "userAddress": "alice",
            "ticketID": 3,
        }])
    );

    let (_, body) = call_json(&app, Method::GET, "/ticket/query?userAddress=bob", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn missing_field_is_a_bad_request() {
    let (app, records) = app();
    let mut body = ticket("0xabc", "alice", 0);
    body.as_object_mut().unwrap().remove("eventName");

    let (status, body) = call_json(&app, Method::POST, "/ticket/add", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "No contractAddress, eventName, userAddress or ticketId parameters."
    );
    assert_eq!(records.ticket_count().await, 0);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let (app, _) = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/ticket/add")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ticket_query_requires_user_address() {
    let (app, _) = app();

    let (status, body) = call_json(&app, Method::GET, "/ticket/query?eventName=Gig", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No userAddress parameter.");
}

#[tokio::test]
async fn update_moves_ticket_to_new_holder() {
    let (app, _) = app();
    call(&app, Method::POST, "/ticket/add", Some(ticket("0xabc", "alice", 1))).await;
    call(&app, Method::POST, "/ticket/add", Some(ticket("0xdef", "alice", 1))).await;

    let (status, _) =
        call_json(&app, Method::PUT, "/ticket/update", Some(ticket("0xabc", "bob", 1))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, alice) = call_json(&app, Method::GET, "/ticket/query?userAddress=alice", None).await;
    let (_, bob) = call_json(&app, Method::GET, "/ticket/query?userAddress=bob", None).await;
    assert_eq!(alice.as_array().unwrap().len(), 1);
    assert_eq!(alice[0]["contractAddress"], "0xdef");
    assert_eq!(bob[0]["contractAddress"], "0xabc");
}

#[tokio::test]
async fn update_of_unindexed_ticket_still_succeeds() {
    let (app, records) = app();

    let (status, body) =
        call_json(&app, Method::PUT, "/ticket/update", Some(ticket("0xabc", "bob", 9))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"], "success");
    assert_eq!(records.ticket_count().await, 0);
}

#[tokio::test]
async fn check_in_removes_ticket_and_can_be_verified() {
    let (app, _) = app();
    call(&app, Method::POST, "/ticket/add", Some(ticket("0xabc", "alice", 0))).await;

    let (status, body) = call_json(
        &app,
        Method::POST,
        "/usedTicket/add",
        Some(json!({
            "userAddress": "alice",
            "contractAddress": "0xabc",
            "ticketId": 0,
            "eventName": "Gig",
            "qrCode": "qr-0",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"], "success");

    let (_, tickets) = call_json(&app, Method::GET, "/ticket/query?userAddress=alice", None).await;
    assert_eq!(tickets, json!([]));

    let (status, list) =
        call_json(&app, Method::GET, "/usedTicket/query?userAddress=alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        list,
        json!([{"eventName": "Gig", "qrCode": "qr-0", "userAddress": "alice"}])
    );

    let (_, valid) = call_json(
        &app,
        Method::GET,
        "/usedTicket/query?userAddress=alice&eventName=Gig&qrCode=qr-0",
        None,
    )
    .await;
    assert_eq!(valid, json!({"result": true}));

    let (_, forged) = call_json(
        &app,
        Method::GET,
        "/usedTicket/query?userAddress=alice&eventName=Gig&qrCode=qr-9",
        None,
    )
    .await;
    assert_eq!(forged, json!({"result": false}));

    let (_, partial) = call_json(
        &app,
        Method::GET,
        "/usedTicket/query?userAddress=alice&eventName=Gig",
        None,
    )
    .await;
    assert_eq!(partial, json!({"result": false}));
}

#[tokio::test]
async fn check_in_routes_accept_lowercase_spelling() {
    let (app, records) = app();

    let (status, _) = call_json(
        &app,
        Method::POST,
        "/usedticket/add",
        Some(json!({
            "userAddress": "alice",
            "contractAddress": "0xabc",
            "ticketId": "7",
            "eventName": "Gig",
            "qrCode": "qr-7",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(records.used_count().await, 1);

    let (status, list) =
        call_json(&app, Method::GET, "/usedticket/query?userAddress=alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["qrCode"], "qr-7");
}

#[tokio::test]
async fn check_in_with_missing_field_is_rejected() {
    let (app, records) = app();

    let (status, body) = call_json(
        &app,
        Method::POST,
        "/usedTicket/add",
        Some(json!({"userAddress": "alice", "contractAddress": "0xabc", "ticketId": 0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "No contractAddress, ticketId, eventName or qrCode parameters."
    );
    assert_eq!(records.used_count().await, 0);
}

#[tokio::test]
async fn used_ticket_query_requires_user_address() {
    let (app, _) = app();

    let (status, _) = call_json(
        &app,
        Method::GET,
        "/usedTicket/query?eventName=Gig&qrCode=qr-0",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_clears_everything() {
    let (app, records) = app();
    call(&app, Method::POST, "/ticket/add", Some(ticket("0xabc", "alice", 0))).await;
    call(
        &app,
        Method::POST,
        "/usedTicket/add",
        Some(json!({
            "userAddress": "bob",
            "contractAddress": "0xabc",
            "ticketId": 1,
            "eventName": "Gig",
            "qrCode": "qr-1",
        })),
    )
    .await;

    let (status, body) = call(&app, Method::GET, "/resetDatabase", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Database cleaned");
    assert_eq!(records.ticket_count().await, 0);
    assert_eq!(records.used_count().await, 0);
}
