//! Given-When-Then harness for storefront reducers
//!
//! Reducers are synchronous, so a test only needs a state, an environment and
//! a list of actions. Effects are checked as descriptions; run them with
//! [`crate::helpers::resolve_effects`] when their results matter.

#![allow(clippy::module_name_repetitions)]

use smallvec::SmallVec;
use storefront_core::{effect::Effect, reducer::Reducer};

type StateCheck<S> = Box<dyn FnOnce(&S)>;
type EffectCheck<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Reducer test builder
///
/// # Example
///
/// ```ignore
/// use storefront_testing::{ReducerTest, assertions};
///
/// ReducerTest::new(CartReducer::new())
///     .with_env(())
///     .given_state(CartState::new())
///     .when_actions([add(mug.clone()), add(mug)])
///     .then_state(|cart| assert_eq!(cart.total_quantity(), 2))
///     .then_effects(assertions::assert_no_effects)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_checks: Vec<StateCheck<S>>,
    effect_checks: Vec<EffectCheck<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Start a test for `reducer`
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_checks: Vec::new(),
            effect_checks: Vec::new(),
        }
    }

    /// Environment handed to every `reduce` call
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Given: the state before the first action
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// When: one more action
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// When: several actions, applied in order
    ///
    /// Effect checks see the effects of the last action only.
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Then: a check on the final state
    #[must_use]
    pub fn then_state<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_checks.push(Box::new(check));
        self
    }

    /// Then: a check on the effects of the last action
    #[must_use]
    pub fn then_effects<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_checks.push(Box::new(check));
        self
    }

    /// Reduce every action, then run the checks
    ///
    /// # Panics
    ///
    /// Panics if the state, environment or actions are missing, or if a
    /// check fails.
    #[allow(clippy::panic, clippy::expect_used)]
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action() or when_actions()"
        );

        let mut effects = SmallVec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env);
        }

        for check in self.state_checks {
            check(&state);
        }
        for check in self.effect_checks {
            check(&effects);
        }
    }
}

/// Checks on effect descriptions
pub mod assertions {
    use storefront_core::effect::Effect;

    /// Nothing for the store to run: empty, or only `Effect::None`
    ///
    /// # Panics
    ///
    /// Panics if any effect would be spawned.
    #[allow(clippy::panic)]
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Exactly `expected` effects, `Effect::None` included
    ///
    /// # Panics
    ///
    /// Panics on a different count.
    #[allow(clippy::panic)]
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {expected} effects, but found {}",
            effects.len()
        );
    }

    /// At least one `Effect::Future`, i.e. a remote call was requested
    ///
    /// # Panics
    ///
    /// Panics if there is none.
    #[allow(clippy::panic)]
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected a Future effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[derive(Clone, Debug, Default)]
    struct Stock {
        units: u32,
        reorders: u32,
    }

    #[derive(Clone, Debug)]
    enum StockAction {
        Receive(u32),
        Sell,
        Reordered,
    }

    struct StockReducer;

    impl Reducer for StockReducer {
        type State = Stock;
        type Action = StockAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Stock,
            action: StockAction,
            _env: &(),
        ) -> SmallVec<[Effect<StockAction>; 4]> {
            match action {
                StockAction::Receive(units) => {
                    state.units += units;
                    smallvec![Effect::None]
                },
                StockAction::Sell => {
                    state.units = state.units.saturating_sub(1);
                    if state.units == 0 {
                        smallvec![Effect::Future(Box::pin(async {
                            Some(StockAction::Reordered)
                        }))]
                    } else {
                        SmallVec::new()
                    }
                },
                StockAction::Reordered => {
                    state.reorders += 1;
                    SmallVec::new()
                },
            }
        }
    }

    #[test]
    fn test_single_action() {
        ReducerTest::new(StockReducer)
            .with_env(())
            .given_state(Stock::default())
            .when_action(StockAction::Receive(3))
            .then_state(|stock| assert_eq!(stock.units, 3))
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn test_when_actions_applies_in_order() {
        ReducerTest::new(StockReducer)
            .with_env(())
            .given_state(Stock::default())
            .when_actions([StockAction::Receive(2), StockAction::Sell, StockAction::Sell])
            .then_state(|stock| assert_eq!(stock.units, 0))
            .then_effects(|effects| assertions::assert_has_future_effect(effects))
            .run();
    }

    #[test]
    fn test_effects_come_from_last_action_only() {
        ReducerTest::new(StockReducer)
            .with_env(())
            .given_state(Stock { units: 1, reorders: 0 })
            .when_actions([StockAction::Sell, StockAction::Reordered])
            .then_state(|stock| assert_eq!(stock.reorders, 1))
            .then_effects(|effects| assertions::assert_effects_count(effects, 0))
            .run();
    }

    #[test]
    #[should_panic(expected = "Initial state must be set")]
    fn test_missing_state_panics() {
        ReducerTest::new(StockReducer)
            .with_env(())
            .when_action(StockAction::Sell)
            .run();
    }
}
