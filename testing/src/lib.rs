//! # Storefront Testing
//!
//! Testing utilities and helpers for the storefront state layer.
//!
//! This crate provides:
//! - Deterministic clocks for the `Clock` environment trait
//! - A Given-When-Then harness for reducers
//! - Helpers that run effect descriptions without a store
//!
//! ## Example
//!
//! ```ignore
//! use storefront_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(CartReducer)
//!     .with_env(())
//!     .given_state(CartState::default())
//!     .when_action(CartAction::AddItem { product })
//!     .then_state(|cart| assert_eq!(cart.total_quantity(), 1))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use storefront_core::environment::Clock;

/// Ergonomic reducer test harness
pub mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use storefront_testing::mocks::FixedClock;
    /// use storefront_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
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

    /// Clock that moves forward by a fixed number of milliseconds per read
    ///
    /// Useful when consecutive checkouts must get distinct timestamps.
    ///
    /// ```
    /// use storefront_testing::mocks::SteppingClock;
    /// use storefront_core::environment::Clock;
    ///
    /// let clock = SteppingClock::starting_at(storefront_testing::test_clock().now(), 5);
    /// let first = clock.now();
    /// let second = clock.now();
    /// assert_eq!((second - first).num_milliseconds(), 5);
    /// ```
    #[derive(Debug)]
    pub struct SteppingClock {
        start: DateTime<Utc>,
        step_ms: i64,
        reads: AtomicI64,
    }

    impl SteppingClock {
        /// Start at `start`, advancing `step_ms` after every read
        #[must_use]
        pub const fn starting_at(start: DateTime<Utc>, step_ms: i64) -> Self {
            Self {
                start,
                step_ms,
                reads: AtomicI64::new(0),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            self.start + chrono::Duration::milliseconds(n * self.step_ms)
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
}

/// Test helpers and utilities
pub mod helpers {
    use futures::future::BoxFuture;
    use storefront_core::effect::Effect;

    /// Execute effects without a store and collect the actions they produce
    ///
    /// Delays are not slept; their action is returned right away. Parallel
    /// groups are run in declaration order, so the result is deterministic.
    ///
    /// ```
    /// use storefront_core::{async_effect, effect::Effect};
    /// use storefront_testing::helpers::resolve_effects;
    ///
    /// let effects: Vec<Effect<u8>> = vec![Effect::None, async_effect! { Some(7) }];
    /// let actions = tokio_test::block_on(resolve_effects(effects));
    /// assert_eq!(actions, vec![7]);
    /// ```
    pub async fn resolve_effects<A, I>(effects: I) -> Vec<A>
    where
        A: Send + 'static,
        I: IntoIterator<Item = Effect<A>>,
    {
        let mut actions = Vec::new();
        for effect in effects {
            resolve_into(effect, &mut actions).await;
        }
        actions
    }

    fn resolve_into<A: Send + 'static>(
        effect: Effect<A>,
        actions: &mut Vec<A>,
    ) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => actions.extend(fut.await),
                Effect::Delay { action, .. } => actions.push(*action),
                Effect::Parallel(group) | Effect::Sequential(group) => {
                    for effect in group {
                        resolve_into(effect, actions).await;
                    }
                },
            }
        })
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SteppingClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::effect::Effect;
    use std::time::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_stepping_clock_advances() {
        let clock = SteppingClock::starting_at(test_clock().now(), 1);
        let a = clock.now();
        let b = clock.now();
        let c = clock.now();
        assert!(a < b && b < c);
        assert_eq!(a, test_clock().now());
    }

    #[test]
    fn test_resolve_nested_effects() {
        let effects = vec![
            Effect::Sequential(vec![
                Effect::Future(Box::pin(async { Some(1) })),
                Effect::Delay {
                    duration: Duration::from_secs(60),
                    action: Box::new(2),
                },
            ]),
            Effect::Parallel(vec![
                Effect::Future(Box::pin(async { None })),
                Effect::Future(Box::pin(async { Some(3) })),
            ]),
        ];

        let actions = tokio_test::block_on(helpers::resolve_effects(effects));
        assert_eq!(actions, vec![1, 2, 3]);
    }
}
