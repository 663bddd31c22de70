//! # Ticketchain Testing
//!
//! Testing utilities for the ticketchain crates.
//!
//! This crate provides:
//! - Mock implementations of environment traits (clock, ids, payouts)
//! - Fixtures for ticket events in a given stage
//! - proptest strategies for ledger values
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use ticketchain_testing::{helpers, ReducerTest};
//! use ticketchain_ledger::{TicketAction, TicketReducer, Stage};
//!
//! #[test]
//! fn buy_ticket_decrements_inventory() {
//!     let (env, _wallets) = helpers::test_environment();
//!     let owner = Address::new();
//!
//!     ReducerTest::new(TicketReducer::new())
//!         .with_env(env)
//!         .given_state(helpers::event_in_stage(owner, Stage::Active))
//!         .when_action(TicketAction::BuyTicket { caller: fan, payment: Amount::from_units(50) })
//!         .then_state(|state| assert_eq!(state.num_tickets_left, 4))
//!         .run();
//! }
//! ```

use chrono::{DateTime, Utc};
use ticketchain_core::environment::Clock;

pub mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use ticketchain_core::environment::IdGenerator;
    use ticketchain_ledger::{Address, Amount, InMemoryWallets, Payout, PayoutError};
    use uuid::Uuid;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticketchain_testing::mocks::FixedClock;
    /// use ticketchain_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Predictable ids: 1, 2, 3, ... as UUIDs
    #[derive(Debug, Default)]
    pub struct SequentialIds {
        next: AtomicU64,
    }

    impl SequentialIds {
        /// Starts at 1
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(0),
            }
        }
    }

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> Uuid {
            let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            Uuid::from_u128(u128::from(id))
        }
    }

    /// Payout target that refuses every transfer
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingPayout;

    impl Payout for FailingPayout {
        fn transfer(
            &self,
            _to: Address,
            _amount: Amount,
        ) -> Pin<Box<dyn Future<Output = Result<(), PayoutError>> + Send + '_>> {
            Box::pin(async { Err(PayoutError::Unavailable("payout disabled".to_string())) })
        }
    }

    /// Payout target that refuses the first `failures` transfers, then
    /// delivers to in-memory wallets
    #[derive(Debug)]
    pub struct FlakyPayout {
        remaining_failures: AtomicUsize,
        wallets: InMemoryWallets,
    }

    impl FlakyPayout {
        /// Fails `failures` times before delivering to `wallets`
        #[must_use]
        pub fn new(failures: usize, wallets: InMemoryWallets) -> Self {
            Self {
                remaining_failures: AtomicUsize::new(failures),
                wallets,
            }
        }
    }

    impl Payout for FlakyPayout {
        fn transfer(
            &self,
            to: Address,
            amount: Amount,
        ) -> Pin<Box<dyn Future<Output = Result<(), PayoutError>> + Send + '_>> {
            let failed = self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();

            if failed {
                Box::pin(async { Err(PayoutError::Rejected("transient failure".to_string())) })
            } else {
                self.wallets.transfer(to, amount)
            }
        }
    }
}

/// Fixtures for ticket events.
pub mod helpers {
    use super::mocks::test_clock;
    use std::sync::Arc;
    use ticketchain_core::environment::Clock;
    use ticketchain_ledger::{
        Address, Amount, EventParams, EventState, InMemoryWallets, Payout, Stage,
        TicketEnvironment,
    };

    /// Environment with the test clock, paying into the returned wallets
    #[must_use]
    pub fn test_environment() -> (TicketEnvironment, InMemoryWallets) {
        let wallets = InMemoryWallets::new();
        let env = environment_with_payout(Arc::new(wallets.clone()));
        (env, wallets)
    }

    /// Environment with the test clock and the given payout target
    #[must_use]
    pub fn environment_with_payout(payout: Arc<dyn Payout>) -> TicketEnvironment {
        TicketEnvironment::new(Arc::new(test_clock()), payout)
    }

    /// 5 tickets at 50, resellable, 20% royalty
    #[must_use]
    pub fn event_params() -> EventParams {
        EventParams::new(5, Amount::from_units(50), true, 20, "EventName", "EventSymbol")
    }

    /// Fresh [`event_params`] state owned by `owner`, moved to `stage`
    ///
    /// # Panics
    ///
    /// Never: the fixture parameters are valid.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn event_in_stage(owner: Address, stage: Stage) -> EventState {
        let mut state = EventState::new(Address::new(), owner, event_params(), test_clock().now())
            .expect("fixture parameters are valid");
        state.stage = stage;
        state
    }

    /// Installs a test-writer tracing subscriber, once per process
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use ticketchain_ledger::{Amount, Stage};

    /// Amounts in `0..=max` base units
    pub fn amount_up_to(max: u128) -> impl Strategy<Value = Amount> {
        (0..=max).prop_map(Amount::from_units)
    }

    /// Any of the six stages
    pub fn any_stage() -> impl Strategy<Value = Stage> {
        prop::sample::select(Stage::ALL.to_vec())
    }
}

// Re-export commonly used items
pub use mocks::{FailingPayout, FixedClock, FlakyPayout, SequentialIds, test_clock};
