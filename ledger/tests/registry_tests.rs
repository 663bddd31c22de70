//! Event registry behavior.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use ticketchain_ledger::{
    Address, Amount, ConstructionError, EventParams, EventRegistry, RegistryNotification, Stage,
    TicketError,
};
use ticketchain_testing::SequentialIds;
use ticketchain_testing::helpers::{event_params, test_environment};
use uuid::Uuid;

fn registry() -> EventRegistry {
    let (env, _) = test_environment();
    EventRegistry::with_ids(env, Arc::new(SequentialIds::new()))
}

#[tokio::test]
async fn created_events_are_listed_in_creation_order() {
    let registry = registry();
    let alice = Address::new();
    let bob = Address::new();

    let first = registry.create_event(alice, event_params()).await.unwrap();
    let second = registry
        .create_event(
            bob,
            EventParams::new(500, Amount::from_units(200), true, 20, "Gig", "GIG"),
        )
        .await
        .unwrap();

    assert_eq!(registry.event_count().await, 2);
    let events = registry.events().await;
    assert_eq!(events[0].address(), first.address());
    assert_eq!(events[1].address(), second.address());
    assert_eq!(first.address(), Address::from_uuid(Uuid::from_u128(1)));
    assert_eq!(second.owner(), bob);
    assert_eq!(second.num_tickets_total(), 500);
}

#[tokio::test]
async fn creator_becomes_owner() {
    let registry = registry();
    let creator = Address::new();

    let event = registry
        .create_event(creator, event_params().with_owner(Address::new()))
        .await
        .unwrap();

    assert_eq!(event.owner(), creator);
    event.set_stage(creator, Stage::Active).await.unwrap();
}

#[tokio::test]
async fn failed_construction_records_nothing() {
    let registry = registry();
    let mut notifications = registry.subscribe();

    let mut params = event_params();
    params.royalty_percent = 150;
    let error = registry
        .create_event(Address::new(), params)
        .await
        .unwrap_err();

    assert_eq!(
        error,
        TicketError::Construction(ConstructionError::RoyaltyOutOfRange(150))
    );
    assert_eq!(registry.event_count().await, 0);
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn creation_is_announced() {
    let registry = registry();
    let mut notifications = registry.subscribe();
    let creator = Address::new();

    let event = registry.create_event(creator, event_params()).await.unwrap();

    assert_eq!(
        notifications.recv().await.unwrap(),
        RegistryNotification::CreateEvent {
            creator,
            event: event.address(),
        }
    );
}

#[tokio::test]
async fn events_can_be_looked_up_by_address() {
    let registry = registry();
    let event = registry
        .create_event(Address::new(), event_params())
        .await
        .unwrap();

    let found = registry.get(event.address()).await.unwrap();
    assert_eq!(found.name(), "EventName");
    assert!(registry.get(Address::new()).await.is_none());

    // Handles share state
    found.set_stage(found.owner(), Stage::Active).await.unwrap();
    assert_eq!(event.stage().await, Stage::Active);
}

#[tokio::test]
async fn capacity_bounds_event_notification_buffers() {
    let (env, _) = test_environment();
    let registry = EventRegistry::with_capacity(env, 1);
    let owner = Address::new();
    let event = registry.create_event(owner, event_params()).await.unwrap();
    event.set_stage(owner, Stage::Active).await.unwrap();

    let mut notifications = event.subscribe();
    event.buy_ticket(Address::new(), Amount::from_units(50)).await.unwrap();
    event.buy_ticket(Address::new(), Amount::from_units(50)).await.unwrap();

    assert!(matches!(
        notifications.recv().await,
        Err(tokio::sync::broadcast::error::RecvError::Lagged(1))
    ));
    let latest = notifications.recv().await.unwrap();
    assert_eq!(latest.ticket_id(), Some(ticketchain_ledger::TicketId::new(1)));
}
