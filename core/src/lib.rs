//! # Ticketchain Core
//!
//! Core traits and types shared by the ticketchain ledger crates.
//!
//! The ledger is built as a set of reducers: every external call is an
//! action, and a reducer turns `(State, Action, Environment)` into either a
//! rejection or an [`Outcome`](effect::Outcome) made of notifications (facts
//! that observers may react to) and effects (side effects the runtime runs
//! after the state change has committed).
//!
//! ## Core Concepts
//!
//! - **State**: Owned domain state for one ledger instance
//! - **Action**: Every input a reducer accepts (caller commands and internal feedback)
//! - **Reducer**: `(State, Action, Environment) → Result<Outcome, Error>`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Atomicity
//!
//! A reducer validates against the settled state before it touches it. When
//! it returns `Err`, the state must be exactly what it was before the call.
//!
//! ## Example
//!
//! ```ignore
//! use ticketchain_core::{effect::Outcome, reducer::Reducer};
//!
//! impl Reducer for TallyReducer {
//!     type State = TallyState;
//!     type Action = TallyAction;
//!     type Notification = TallyNotification;
//!     type Error = TallyError;
//!     type Environment = TallyEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TallyState,
//!         action: TallyAction,
//!         env: &TallyEnvironment,
//!     ) -> Result<Outcome<TallyAction, TallyNotification>, TallyError> {
//!         // Validate, then apply
//!         Ok(Outcome::new())
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - The core trait for business logic
///
/// Reducers are deterministic: `(State, Action, Environment) → (State, Outcome)`.
/// All I/O is described as effects and executed by the runtime.
pub mod reducer {
    use super::effect::Outcome;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Notification`: Facts broadcast to observers after a commit
    /// - `Error`: Rejection reasons
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The notification type emitted on successful actions
        type Notification;

        /// The rejection type
        type Error;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes, notifications and effects
        ///
        /// 1. Validates the action against `state`
        /// 2. Updates state in place
        /// 3. Returns what happened and which effects to execute
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action is rejected. A rejected
        /// action must leave `state` unchanged.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Outcome<Self::Action, Self::Notification>, Self::Error>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values returned by reducers. They are executed by the
/// runtime only after the state change that produced them has committed.
pub mod effect {
    use smallvec::SmallVec;
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap a future as an effect
        #[must_use]
        pub fn future<F>(future: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().all(Effect::is_none)
                },
                Effect::Future(_) => false,
            }
        }
    }

    /// Result of a committed action
    ///
    /// `notifications` are broadcast by the runtime before the state lock is
    /// released, so observers see them in commit order. `effects` run after.
    #[derive(Debug)]
    pub struct Outcome<Action, Notification> {
        /// Facts describing what the action changed
        pub notifications: SmallVec<[Notification; 4]>,
        /// Side effects to execute after the commit
        pub effects: SmallVec<[Effect<Action>; 4]>,
    }

    impl<Action, Notification> Outcome<Action, Notification> {
        /// An outcome with no notifications and no effects
        #[must_use]
        pub fn new() -> Self {
            Self {
                notifications: SmallVec::new(),
                effects: SmallVec::new(),
            }
        }

        /// An outcome carrying a single notification
        #[must_use]
        pub fn notify(notification: Notification) -> Self {
            Self::new().and_notify(notification)
        }

        /// Adds a notification
        #[must_use]
        pub fn and_notify(mut self, notification: Notification) -> Self {
            self.notifications.push(notification);
            self
        }

        /// Adds an effect
        #[must_use]
        pub fn with_effect(mut self, effect: Effect<Action>) -> Self {
            self.effects.push(effect);
            self
        }

        /// Whether there is anything for the runtime to execute
        #[must_use]
        pub fn has_effects(&self) -> bool {
            !self.effects.iter().all(Effect::is_none)
        }
    }

    impl<Action, Notification> Default for Outcome<Action, Notification> {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Identifier generation for new ledger instances and accounts
    pub trait IdGenerator: Send + Sync {
        /// Produce a fresh identifier
        fn next_id(&self) -> Uuid;
    }

    /// Random v4 identifiers
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RandomIds;

    impl IdGenerator for RandomIds {
        fn next_id(&self) -> Uuid {
            Uuid::new_v4()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::{Effect, Outcome};
    use super::environment::{Clock, IdGenerator, RandomIds, SystemClock};

    #[test]
    fn outcome_builder_collects_notifications_and_effects() {
        let outcome: Outcome<u8, &str> = Outcome::notify("first")
            .and_notify("second")
            .with_effect(Effect::None);

        assert_eq!(outcome.notifications.as_slice(), &["first", "second"]);
        assert_eq!(outcome.effects.len(), 1);
        assert!(!outcome.has_effects());
    }

    #[test]
    fn future_effect_counts_as_work() {
        let outcome: Outcome<u8, ()> =
            Outcome::new().with_effect(Effect::merge(vec![Effect::None, Effect::future(async {
                Some(1)
            })]));

        assert!(outcome.has_effects());
        assert_eq!(
            format!("{:?}", outcome.effects[0]),
            "Effect::Parallel([Effect::None, Effect::Future(<future>)])"
        );
    }

    #[test]
    fn nested_none_effects_are_none() {
        let effect: Effect<u8> = Effect::chain(vec![Effect::None, Effect::merge(vec![])]);
        assert!(effect.is_none());
    }

    #[test]
    fn future_effect_resolves_to_feedback_action() {
        let Effect::Future(future) = Effect::<u8>::future(async { Some(7) }) else {
            unreachable!("constructed as a future");
        };
        assert_eq!(tokio_test::block_on(future), Some(7));
    }

    #[test]
    fn system_clock_and_random_ids() {
        let clock = SystemClock;
        assert!(clock.now() <= clock.now());
        assert_ne!(RandomIds.next_id(), RandomIds.next_id());
    }
}
