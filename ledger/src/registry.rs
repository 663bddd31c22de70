//! Event factory and directory.
//!
//! The registry creates ticket events on behalf of a creator and keeps an
//! append-only list of them in creation order.

use crate::environment::TicketEnvironment;
use crate::error::TicketError;
use crate::event::TicketEvent;
use crate::notification::RegistryNotification;
use crate::types::{Address, EventParams};
use std::sync::Arc;
use ticketchain_core::environment::{IdGenerator, RandomIds};
use ticketchain_runtime::DEFAULT_BROADCAST_CAPACITY;
use tokio::sync::{RwLock, broadcast};

struct RegistryInner {
    env: TicketEnvironment,
    ids: Arc<dyn IdGenerator>,
    capacity: usize,
    events: RwLock<Vec<TicketEvent>>,
    notifications: broadcast::Sender<RegistryNotification>,
}

/// Creates ticket events and lists them
///
/// Cloning is cheap; clones share the same list.
#[derive(Clone)]
pub struct EventRegistry {
    inner: Arc<RegistryInner>,
}

impl EventRegistry {
    /// Registry whose events share `env`, with random event addresses
    #[must_use]
    pub fn new(env: TicketEnvironment) -> Self {
        Self::with_ids(env, Arc::new(RandomIds))
    }

    /// Registry that takes event addresses from `ids`
    #[must_use]
    pub fn with_ids(env: TicketEnvironment, ids: Arc<dyn IdGenerator>) -> Self {
        Self::build(env, ids, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Registry whose events and own notifications buffer up to `capacity`
    /// messages per subscriber
    #[must_use]
    pub fn with_capacity(env: TicketEnvironment, capacity: usize) -> Self {
        Self::build(env, Arc::new(RandomIds), capacity)
    }

    fn build(env: TicketEnvironment, ids: Arc<dyn IdGenerator>, capacity: usize) -> Self {
        let (notifications, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(RegistryInner {
                env,
                ids,
                capacity,
                events: RwLock::new(Vec::new()),
                notifications,
            }),
        }
    }

    /// Creates an event owned by `creator`
    ///
    /// Any owner named in `params` is replaced by `creator`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Construction`] when `params` are invalid;
    /// nothing is recorded in that case.
    pub async fn create_event(
        &self,
        creator: Address,
        params: EventParams,
    ) -> Result<TicketEvent, TicketError> {
        let address = Address::from_uuid(self.inner.ids.next_id());
        let params = params.with_owner(creator);

        let event = match TicketEvent::deploy_with_capacity(
            address,
            creator,
            params,
            self.inner.env.clone(),
            self.inner.capacity,
        ) {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(%creator, %error, "Event creation rejected");
                return Err(error);
            },
        };

        // Append and broadcast under the same lock so notification order
        // matches the list order
        let mut events = self.inner.events.write().await;
        events.push(event.clone());
        let _ = self.inner.notifications.send(RegistryNotification::CreateEvent {
            creator,
            event: address,
        });

        tracing::info!(%creator, event = %address, total = events.len(), "Event created");
        Ok(event)
    }

    /// Every event in creation order
    pub async fn events(&self) -> Vec<TicketEvent> {
        self.inner.events.read().await.clone()
    }

    /// Number of events created
    pub async fn event_count(&self) -> usize {
        self.inner.events.read().await.len()
    }

    /// Looks up an event by address
    pub async fn get(&self, address: Address) -> Option<TicketEvent> {
        self.inner
            .events
            .read()
            .await
            .iter()
            .find(|event| event.address() == address)
            .cloned()
    }

    /// Subscribes to creations committed after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryNotification> {
        self.inner.notifications.subscribe()
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry").finish_non_exhaustive()
    }
}
