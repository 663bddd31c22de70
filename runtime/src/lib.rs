//! # Ticketchain Runtime
//!
//! The [`Store`] runs a reducer as a single-writer ledger:
//!
//! - Every action is reduced while holding the state write lock, so actions
//!   never interleave and readers only observe settled state
//! - Notifications are broadcast before the lock is released, in commit order
//! - Effects run after the commit in a spawned task; actions they produce are
//!   fed back through the reducer
//!
//! ## Example
//!
//! ```ignore
//! use ticketchain_runtime::Store;
//!
//! let store = Store::new(initial_state, reducer, environment);
//!
//! let receipt = store.send(action).await?;
//! receipt.effects.wait().await;
//!
//! let value = store.state(|s| s.some_field).await;
//! ```

use futures::future::{BoxFuture, join_all};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use ticketchain_core::{SmallVec, effect::Effect, effect::Outcome, reducer::Reducer};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Default capacity of the notification broadcast channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Handle to the effects spawned by one `send`
///
/// Actions fed back by those effects (and their own effects) are executed
/// inside the same task, so waiting on the handle covers the whole chain.
#[derive(Debug)]
pub struct EffectHandle {
    task: Option<JoinHandle<()>>,
}

impl EffectHandle {
    /// A handle for an action that produced no effects
    #[must_use]
    pub const fn completed() -> Self {
        Self { task: None }
    }

    /// Whether every effect (and feedback action) has finished
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait until every effect (and feedback action) has finished
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::error!(%error, "Effect task failed");
            }
        }
    }
}

/// What a committed `send` produced
#[derive(Debug)]
pub struct Receipt<N> {
    /// Notifications emitted by the committed action
    pub notifications: SmallVec<[N; 4]>,
    /// Effects spawned after the commit
    pub effects: EffectHandle,
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The Store - runtime for one reducer instance
///
/// Cloning a `Store` is cheap and yields another handle to the same state.
pub struct Store<R>
where
    R: Reducer,
{
    state: Arc<RwLock<R::State>>,
    reducer: Arc<R>,
    environment: Arc<R::Environment>,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    notifications: broadcast::Sender<R::Notification>,
}

impl<R> Clone for Store<R>
where
    R: Reducer,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: Arc::clone(&self.reducer),
            environment: Arc::clone(&self.environment),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            notifications: self.notifications.clone(),
        }
    }
}

impl<R> Store<R>
where
    R: Reducer + Send + Sync + 'static,
    R::State: Send + Sync + 'static,
    R::Action: Send + 'static,
    R::Notification: Clone + Send + 'static,
    R::Error: From<StoreError> + std::fmt::Display + Send + 'static,
    R::Environment: Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: R::State, reducer: R, environment: R::Environment) -> Self {
        Self::with_broadcast_capacity(
            initial_state,
            reducer,
            environment,
            DEFAULT_BROADCAST_CAPACITY,
        )
    }

    /// Create a new store with a custom notification broadcast capacity
    ///
    /// Increase the capacity when subscribers are slow (e.g. they relay
    /// notifications over HTTP) and frequently lag.
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: R::State,
        reducer: R,
        environment: R::Environment,
        capacity: usize,
    ) -> Self {
        let (notifications, _) = broadcast::channel(capacity.max(1));

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer: Arc::new(reducer),
            environment: Arc::new(environment),
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            notifications,
        }
    }

    /// Send an action to the store
    ///
    /// 1. Acquires the write lock on state
    /// 2. Calls the reducer with (state, action, environment)
    /// 3. Broadcasts notifications, then releases the lock
    /// 4. Spawns the returned effects
    ///
    /// `send` returns once the action has committed, not once its effects
    /// have completed. Use [`EffectHandle::wait`] for that.
    ///
    /// # Errors
    ///
    /// Returns the reducer's rejection, or [`StoreError::ShutdownInProgress`]
    /// (converted into `R::Error`) when the store is shutting down.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: R::Action) -> Result<Receipt<R::Notification>, R::Error> {
        if self.shutdown.load(Ordering::Acquire) {
            metrics::counter!("ticketchain.store.actions", "outcome" => "shutdown").increment(1);
            return Err(StoreError::ShutdownInProgress.into());
        }

        let Outcome {
            notifications,
            effects,
        } = self.commit(action).await?;

        let effects = self.spawn_effects(effects);
        Ok(Receipt {
            notifications,
            effects,
        })
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let left = store.state(|s| s.num_tickets_left).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R::State) -> T,
    {
        let state = self.state.read().await;
        f(&*state)
    }

    /// Subscribe to notifications committed after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<R::Notification> {
        self.notifications.subscribe()
    }

    /// Access the injected environment
    #[must_use]
    pub fn environment(&self) -> &R::Environment {
        &self.environment
    }

    /// Number of effect tasks still running
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.pending_effects.load(Ordering::Acquire)
    }

    /// Whether `shutdown` has been initiated
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop accepting actions and wait for running effects to finish
    ///
    /// Feedback actions produced by in-flight effects are still reduced, so
    /// compensations land even while shutting down.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the timeout expires.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");
        metrics::counter!("ticketchain.store.shutdown.initiated").increment(1);

        self.shutdown.store(true, Ordering::Release);

        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            let pending = self.pending_effects.load(Ordering::Acquire);

            if pending == 0 {
                tracing::info!("All effects completed, shutdown successful");
                metrics::counter!("ticketchain.store.shutdown.completed").increment(1);
                return Ok(());
            }

            if start.elapsed() >= timeout {
                tracing::error!(pending_effects = pending, "Shutdown timed out");
                metrics::counter!("ticketchain.store.shutdown.timeout").increment(1);
                return Err(StoreError::ShutdownTimeout(pending));
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Reduce one action under the write lock
    async fn commit(
        &self,
        action: R::Action,
    ) -> Result<Outcome<R::Action, R::Notification>, R::Error> {
        let mut state = self.state.write().await;

        match self.reducer.reduce(&mut state, action, &self.environment) {
            Ok(outcome) => {
                for notification in &outcome.notifications {
                    // No subscribers is not an error
                    let _ = self.notifications.send(notification.clone());
                }
                metrics::counter!("ticketchain.store.actions", "outcome" => "committed")
                    .increment(1);
                Ok(outcome)
            },
            Err(error) => {
                tracing::debug!(%error, "Action rejected");
                metrics::counter!("ticketchain.store.actions", "outcome" => "rejected")
                    .increment(1);
                Err(error)
            },
        }
    }

    fn spawn_effects(&self, effects: SmallVec<[Effect<R::Action>; 4]>) -> EffectHandle {
        let effects: Vec<_> = effects.into_iter().filter(|e| !e.is_none()).collect();
        if effects.is_empty() {
            return EffectHandle::completed();
        }

        self.pending_effects.fetch_add(1, Ordering::SeqCst);
        let guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
        let store = self.clone();

        let task = tokio::spawn(async move {
            let _guard = guard;
            store.execute(Effect::Parallel(effects)).await;
        });

        EffectHandle { task: Some(task) }
    }

    fn execute(&self, effect: Effect<R::Action>) -> BoxFuture<'static, ()> {
        let store = self.clone();

        Box::pin(async move {
            match effect {
                Effect::None => {},
                Effect::Parallel(effects) => {
                    join_all(effects.into_iter().map(|e| store.execute(e))).await;
                },
                Effect::Sequential(effects) => {
                    for effect in effects {
                        store.execute(effect).await;
                    }
                },
                Effect::Future(future) => {
                    if let Some(action) = future.await {
                        store.feed_back(action).await;
                    }
                },
            }
        })
    }

    async fn feed_back(&self, action: R::Action) {
        match self.commit(action).await {
            Ok(outcome) => {
                let effects: Vec<_> = outcome.effects.into_iter().collect();
                self.execute(Effect::Parallel(effects)).await;
            },
            Err(error) => {
                tracing::warn!(%error, "Feedback action rejected");
            },
        }
    }
}
