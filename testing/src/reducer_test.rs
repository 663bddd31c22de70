//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use ticketchain_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type NotificationAssertion<N> = Box<dyn FnOnce(&[N])>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;
type ErrorAssertion<E> = Box<dyn FnOnce(&E)>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// A test either expects the action to commit (the default) or, after
/// [`then_error`](Self::then_error), expects a rejection. A rejected action
/// is also checked to have left the state exactly as it was.
///
/// # Example
///
/// ```ignore
/// use ticketchain_testing::ReducerTest;
///
/// ReducerTest::new(TicketReducer::new())
///     .with_env(env)
///     .given_state(state)
///     .when_action(TicketAction::BuyTicket { caller, payment })
///     .then_state(|state| {
///         assert_eq!(state.num_tickets_left, 4);
///     })
///     .then_notifications(|notifications| {
///         assert_eq!(notifications.len(), 1);
///     })
///     .run();
/// ```
pub struct ReducerTest<R>
where
    R: Reducer,
{
    reducer: R,
    environment: Option<R::Environment>,
    initial_state: Option<R::State>,
    action: Option<R::Action>,
    state_assertions: Vec<StateAssertion<R::State>>,
    notification_assertions: Vec<NotificationAssertion<R::Notification>>,
    effect_assertions: Vec<EffectAssertion<R::Action>>,
    error_assertions: Vec<ErrorAssertion<R::Error>>,
}

impl<R> ReducerTest<R>
where
    R: Reducer,
    R::State: Clone + PartialEq + std::fmt::Debug,
    R::Error: std::fmt::Debug,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            action: None,
            state_assertions: Vec::new(),
            notification_assertions: Vec::new(),
            effect_assertions: Vec::new(),
            error_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: R::Environment) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the emitted notifications (Then)
    #[must_use]
    pub fn then_notifications<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[R::Notification]) + 'static,
    {
        self.notification_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<R::Action>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Expect a rejection and assert on it (Then)
    #[must_use]
    pub fn then_error<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::Error) + 'static,
    {
        self.error_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set, if the
    /// action commits or is rejected contrary to expectation, or if any
    /// assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let before = state.clone();
        let expects_error = !self.error_assertions.is_empty();

        match self.reducer.reduce(&mut state, action, &env) {
            Ok(outcome) => {
                assert!(
                    !expects_error,
                    "Expected the action to be rejected, but it committed"
                );

                for assertion in self.notification_assertions {
                    assertion(outcome.notifications.as_slice());
                }
                for assertion in self.effect_assertions {
                    assertion(outcome.effects.as_slice());
                }
            },
            Err(error) => {
                assert!(expects_error, "Action was rejected: {error:?}");
                assert_eq!(state, before, "Rejected action modified state");

                for assertion in self.error_assertions {
                    assertion(&error);
                }
            },
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use ticketchain_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect would do work.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketchain_core::effect::Outcome;

    #[derive(Clone, Debug, PartialEq)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Decrement,
    }

    #[derive(Debug, PartialEq)]
    enum TestError {
        BelowZero,
    }

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Notification = i32;
        type Error = TestError;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> Result<Outcome<TestAction, i32>, TestError> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                },
                TestAction::Decrement => {
                    if state.count == 0 {
                        return Err(TestError::BelowZero);
                    }
                    state.count -= 1;
                },
            }
            Ok(Outcome::notify(state.count).with_effect(Effect::None))
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_notifications(|notifications| {
                assert_eq!(notifications, &[1]);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_rejection() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Decrement)
            .then_error(|error| {
                assert_eq!(error, &TestError::BelowZero);
            })
            .then_state(|state| {
                assert_eq!(state.count, 0);
            })
            .run();
    }

    #[test]
    #[should_panic(expected = "Action was rejected")]
    fn test_unexpected_rejection_fails() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Decrement)
            .run();
    }

    #[test]
    fn test_assertions_effects_count() {
        assertions::assert_effects_count(&[Effect::<TestAction>::None], 1);
        assertions::assert_effects_count::<TestAction>(&[], 0);
        assertions::assert_no_effects::<TestAction>(&[Effect::None]);
    }
}
