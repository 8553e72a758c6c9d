//! Root state and reducer: cart, orders and session plus the checkout flow
//! that spans all three.
//!
//! Checkout snapshots the cart into a `New` order, uploads it, and only on
//! success appends the order and clears the cart. While the upload is in
//! flight the cart is locked, so the snapshot and the cart that gets cleared
//! are always the same.

use crate::cart::{CartAction, CartReducer, CartState};
use crate::environment::StorefrontEnvironment;
use crate::error::{ApiError, CheckoutError};
use crate::orders::{OrdersAction, OrdersReducer, OrdersState};
use crate::session::{SessionAction, SessionReducer, SessionState};
use crate::types::{Order, OrderId, RequestId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use storefront_core::{SmallVec, async_effect, effect::Effect, reducer::Reducer, smallvec};
use storefront_macros::Action;

/// Where the current (or last) checkout stands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CheckoutStatus {
    /// No checkout attempted yet
    #[default]
    Idle,
    /// Upload in flight; the cart is locked
    InFlight {
        /// Correlation id of the `Checkout` action
        request_id: RequestId,
        /// Order that will be appended on success
        order: Order,
    },
    /// Last checkout placed this order
    Completed {
        /// Placed order
        order_id: OrderId,
    },
    /// Last upload failed; cart and orders were left alone
    Failed {
        /// Order that was not placed
        order_id: OrderId,
        /// Failure
        error: ApiError,
    },
    /// Last checkout was refused before any upload
    Rejected(CheckoutError),
}

impl CheckoutStatus {
    /// Whether an upload is in flight
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight { .. })
    }
}

/// Everything the storefront client keeps in memory
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorefrontState {
    /// Cart contents
    pub cart: CartState,
    /// Placed orders
    pub orders: OrdersState,
    /// Signed-in user
    pub session: SessionState,
    /// Checkout progress
    pub checkout: CheckoutStatus,
    /// Last cart action refused because a checkout was in flight
    pub last_rejected: Option<CartAction>,
}

impl StorefrontState {
    /// Empty cart, no orders, signed out
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Root action
#[derive(Action, Clone, Debug, PartialEq, Eq)]
pub enum StorefrontAction {
    /// Cart command
    Cart(CartAction),

    /// Order command or result
    Orders(OrdersAction),

    /// Session command
    Session(SessionAction),

    /// Turn the cart into an order
    #[command]
    Checkout {
        /// Correlation id
        request_id: RequestId,
    },

    /// Checkout refused before upload
    #[event]
    CheckoutRejected {
        /// Correlation id
        request_id: RequestId,
        /// Why
        reason: CheckoutError,
    },

    /// Upload confirmed
    #[event]
    CheckoutSucceeded {
        /// Correlation id
        request_id: RequestId,
        /// Placed order
        order_id: OrderId,
    },

    /// Upload failed
    #[event]
    CheckoutFailed {
        /// Correlation id
        request_id: RequestId,
        /// Order that was not placed
        order_id: OrderId,
        /// Failure
        error: ApiError,
    },
}

impl StorefrontAction {
    /// `Checkout` with a fresh request id
    #[must_use]
    pub fn checkout() -> Self {
        Self::Checkout {
            request_id: RequestId::next(),
        }
    }

    /// Whether this is the final result of checkout request `id`
    #[must_use]
    pub fn completes_checkout(&self, id: RequestId) -> bool {
        match self {
            Self::CheckoutRejected { request_id, .. }
            | Self::CheckoutSucceeded { request_id, .. }
            | Self::CheckoutFailed { request_id, .. } => *request_id == id,
            _ => false,
        }
    }

    /// Whether this is the final result of orders request `id`
    #[must_use]
    pub fn completes_orders_request(&self, id: RequestId) -> bool {
        matches!(self, Self::Orders(action) if action.completes(id))
    }
}

impl From<CartAction> for StorefrontAction {
    fn from(action: CartAction) -> Self {
        Self::Cart(action)
    }
}

impl From<OrdersAction> for StorefrontAction {
    fn from(action: OrdersAction) -> Self {
        Self::Orders(action)
    }
}

impl From<SessionAction> for StorefrontAction {
    fn from(action: SessionAction) -> Self {
        Self::Session(action)
    }
}

/// Order id for a checkout at `at`, unique within `orders`
///
/// The millisecond timestamp, with `-1`, `-2`, ... appended on collision.
#[must_use]
pub fn next_order_id(orders: &OrdersState, at: DateTime<Utc>) -> OrderId {
    let base = OrderId::from_timestamp(at);
    if orders.get(&base).is_none() {
        return base;
    }

    let mut suffix = 1_u32;
    loop {
        let candidate = OrderId::new(format!("{base}-{suffix}"));
        if orders.get(&candidate).is_none() {
            return candidate;
        }
        suffix += 1;
    }
}

/// Root reducer
///
/// Delegates cart, order and session actions to their reducers and runs the
/// checkout flow itself.
#[derive(Clone, Debug, Default)]
pub struct StorefrontReducer {
    cart: CartReducer,
    orders: OrdersReducer,
    session: SessionReducer,
}

impl StorefrontReducer {
    /// Creates a new `StorefrontReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cart: CartReducer::new(),
            orders: OrdersReducer::new(),
            session: SessionReducer::new(),
        }
    }

    fn reject(
        state: &mut StorefrontState,
        request_id: RequestId,
        reason: CheckoutError,
    ) -> SmallVec<[Effect<StorefrontAction>; 4]> {
        tracing::warn!(%request_id, %reason, "Checkout rejected");
        state.checkout = CheckoutStatus::Rejected(reason.clone());
        smallvec![Self::notify_rejected(request_id, reason)]
    }

    fn notify_rejected(request_id: RequestId, reason: CheckoutError) -> Effect<StorefrontAction> {
        async_effect! {
            Some(StorefrontAction::CheckoutRejected { request_id, reason })
        }
    }

    fn lift_orders(
        effects: SmallVec<[Effect<OrdersAction>; 4]>,
    ) -> SmallVec<[Effect<StorefrontAction>; 4]> {
        effects
            .into_iter()
            .map(|effect| effect.map(StorefrontAction::Orders))
            .collect()
    }

    fn start_checkout(
        state: &mut StorefrontState,
        request_id: RequestId,
        env: &StorefrontEnvironment,
    ) -> SmallVec<[Effect<StorefrontAction>; 4]> {
        if state.checkout.is_in_flight() {
            // Keep the running checkout; only tell this caller
            tracing::warn!(%request_id, "Checkout ignored: another one is in flight");
            return smallvec![Self::notify_rejected(
                request_id,
                CheckoutError::AlreadyInFlight
            )];
        }

        if !state.session.is_authenticated() {
            return Self::reject(state, request_id, CheckoutError::NotAuthenticated);
        }

        if state.cart.is_empty() {
            return Self::reject(state, request_id, CheckoutError::EmptyCart);
        }

        let placed_at = env.clock.now();
        let order_id = next_order_id(&state.orders, placed_at);
        let order = Order::new(order_id.clone(), state.cart.items().to_vec(), placed_at);

        tracing::info!(%request_id, %order_id, total = %order.total, "Checkout started");
        state.checkout = CheckoutStatus::InFlight {
            request_id,
            order: order.clone(),
        };

        let api = Arc::clone(&env.api);
        smallvec![async_effect! {
            Some(match api.upload_order(&order).await {
                Ok(()) => StorefrontAction::CheckoutSucceeded { request_id, order_id },
                Err(error) => StorefrontAction::CheckoutFailed { request_id, order_id, error },
            })
        }]
    }
}

impl Reducer for StorefrontReducer {
    type State = StorefrontState;
    type Action = StorefrontAction;
    type Environment = StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            StorefrontAction::Cart(action) => {
                if state.checkout.is_in_flight() {
                    tracing::warn!(action = action.name(), "Cart is locked during checkout");
                    state.last_rejected = Some(action);
                    return SmallVec::new();
                }
                // The cart reducer never produces effects
                let _ = self.cart.reduce(&mut state.cart, action, &());
                SmallVec::new()
            }

            StorefrontAction::Orders(action) => {
                Self::lift_orders(self.orders.reduce(&mut state.orders, action, env))
            }

            StorefrontAction::Session(action) => {
                let _ = self.session.reduce(&mut state.session, action, &());
                SmallVec::new()
            }

            StorefrontAction::Checkout { request_id } => {
                Self::start_checkout(state, request_id, env)
            }

            StorefrontAction::CheckoutRejected { .. } => SmallVec::new(),

            StorefrontAction::CheckoutSucceeded {
                request_id,
                order_id,
            } => match std::mem::take(&mut state.checkout) {
                CheckoutStatus::InFlight { order, .. } if order.id == order_id => {
                    tracing::info!(%request_id, %order_id, "Checkout completed");
                    let effects = Self::lift_orders(self.orders.reduce(
                        &mut state.orders,
                        OrdersAction::OrderPlaced { order },
                        env,
                    ));
                    let _ = self.cart.reduce(&mut state.cart, CartAction::Clear, &());
                    state.checkout = CheckoutStatus::Completed { order_id };
                    effects
                }
                other => {
                    tracing::warn!(%request_id, %order_id, "Stale checkout result ignored");
                    state.checkout = other;
                    SmallVec::new()
                }
            },

            StorefrontAction::CheckoutFailed {
                request_id,
                order_id,
                error,
            } => {
                let current = matches!(
                    &state.checkout,
                    CheckoutStatus::InFlight { order, .. } if order.id == order_id
                );
                if current {
                    tracing::warn!(%request_id, %order_id, %error, "Checkout failed");
                    state.checkout = CheckoutStatus::Failed { order_id, error };
                } else {
                    tracing::warn!(%request_id, %order_id, "Stale checkout failure ignored");
                }
                SmallVec::new()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mocks::InMemoryOrderApi;
    use crate::types::{OrderStatus, Product};
    use rust_decimal::Decimal;
    use storefront_core::environment::Clock;
    use storefront_testing::helpers::resolve_effects;
    use storefront_testing::{ReducerTest, assertions, test_clock};

    fn env(api: &InMemoryOrderApi) -> StorefrontEnvironment {
        StorefrontEnvironment::new(Arc::new(api.clone()), Arc::new(test_clock()))
    }

    fn add(id: u64, cents: i64) -> StorefrontAction {
        CartAction::AddItem {
            product: Product::new(id, format!("Product {id}"), Decimal::new(cents, 2)),
        }
        .into()
    }

    fn signed_in() -> StorefrontAction {
        SessionAction::SignIn {
            email: "ada@example.com".to_string(),
            password: "pw".to_string(),
        }
        .into()
    }

    fn reduce_all(
        state: &mut StorefrontState,
        env: &StorefrontEnvironment,
        actions: impl IntoIterator<Item = StorefrontAction>,
    ) -> SmallVec<[Effect<StorefrontAction>; 4]> {
        let mut effects = SmallVec::new();
        for action in actions {
            effects = StorefrontReducer::new().reduce(state, action, env);
        }
        effects
    }

    #[test]
    fn test_checkout_requires_sign_in() {
        let api = InMemoryOrderApi::new();
        ReducerTest::new(StorefrontReducer::new())
            .with_env(env(&api))
            .given_state(StorefrontState::new())
            .when_actions([add(1, 1000), StorefrontAction::checkout()])
            .then_state(|state| {
                assert_eq!(
                    state.checkout,
                    CheckoutStatus::Rejected(CheckoutError::NotAuthenticated)
                );
                assert_eq!(state.cart.total_quantity(), 1);
                assert!(state.orders.orders().is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_checkout_rejects_empty_cart() {
        let api = InMemoryOrderApi::new();
        ReducerTest::new(StorefrontReducer::new())
            .with_env(env(&api))
            .given_state(StorefrontState::new())
            .when_actions([signed_in(), StorefrontAction::checkout()])
            .then_state(|state| {
                assert_eq!(state.checkout, CheckoutStatus::Rejected(CheckoutError::EmptyCart));
            })
            .run();
    }

    #[tokio::test]
    async fn test_checkout_success_places_snapshot() {
        let api = InMemoryOrderApi::new();
        let env = env(&api);
        let mut state = StorefrontState::new();

        let effects = reduce_all(
            &mut state,
            &env,
            [signed_in(), add(1, 1000), add(1, 1000), add(2, 500), StorefrontAction::checkout()],
        );
        let snapshot = state.cart.items().to_vec();
        assert!(state.checkout.is_in_flight());

        let results = resolve_effects(effects).await;
        assert!(matches!(
            results.as_slice(),
            [StorefrontAction::CheckoutSucceeded { .. }]
        ));
        reduce_all(&mut state, &env, results);

        assert!(state.cart.is_empty());
        let orders = state.orders.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].items, snapshot);
        assert_eq!(orders[0].total, Decimal::new(2500, 2));
        assert_eq!(orders[0].status, OrderStatus::New);
        assert_eq!(orders[0].id, OrderId::from_timestamp(test_clock().now()));
        assert_eq!(
            state.checkout,
            CheckoutStatus::Completed {
                order_id: orders[0].id.clone()
            }
        );

        // Later cart changes do not reach the placed order
        reduce_all(&mut state, &env, [add(1, 1000)]);
        assert_eq!(state.orders.orders()[0].items, snapshot);

        let uploaded = api.uploads();
        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0][0].count, 2);
    }

    #[tokio::test]
    async fn test_checkout_failure_leaves_cart_and_orders() {
        let api = InMemoryOrderApi::new();
        api.fail_next(ApiError::Transport("connection reset".to_string()));
        let env = env(&api);
        let mut state = StorefrontState::new();

        let effects = reduce_all(
            &mut state,
            &env,
            [signed_in(), add(1, 1000), StorefrontAction::checkout()],
        );
        let results = resolve_effects(effects).await;
        reduce_all(&mut state, &env, results);

        assert_eq!(state.cart.total_quantity(), 1);
        assert!(state.orders.orders().is_empty());
        assert!(matches!(
            state.checkout,
            CheckoutStatus::Failed {
                error: ApiError::Transport(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_cart_locked_while_in_flight() {
        let api = InMemoryOrderApi::new();
        let env = env(&api);
        let mut state = StorefrontState::new();

        let effects = reduce_all(
            &mut state,
            &env,
            [signed_in(), add(1, 1000), StorefrontAction::checkout()],
        );

        reduce_all(&mut state, &env, [add(2, 500)]);
        assert_eq!(state.cart.len(), 1);
        assert!(matches!(
            state.last_rejected,
            Some(CartAction::AddItem { .. })
        ));

        let second = reduce_all(&mut state, &env, [StorefrontAction::checkout()]);
        let notified = resolve_effects(second).await;
        assert!(matches!(
            notified.as_slice(),
            [StorefrontAction::CheckoutRejected {
                reason: CheckoutError::AlreadyInFlight,
                ..
            }]
        ));
        assert!(state.checkout.is_in_flight());

        let results = resolve_effects(effects).await;
        reduce_all(&mut state, &env, results);
        assert!(state.cart.is_empty());
        assert_eq!(state.orders.orders().len(), 1);
    }

    #[test]
    fn test_stale_success_is_ignored() {
        let api = InMemoryOrderApi::new();
        ReducerTest::new(StorefrontReducer::new())
            .with_env(env(&api))
            .given_state(StorefrontState::new())
            .when_action(StorefrontAction::CheckoutSucceeded {
                request_id: RequestId::next(),
                order_id: OrderId::new("1"),
            })
            .then_state(|state| {
                assert_eq!(state.checkout, CheckoutStatus::Idle);
                assert!(state.orders.orders().is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 0);
            })
            .run();
    }

    #[test]
    fn test_order_ids_stay_unique() {
        let mut orders = OrdersState::new();
        let at = test_clock().now();
        let reducer = OrdersReducer::new();
        let api = InMemoryOrderApi::new();

        for _ in 0..3 {
            let id = next_order_id(&orders, at);
            let _ = reducer.reduce(
                &mut orders,
                OrdersAction::OrderPlaced {
                    order: Order::new(id, Vec::new(), at),
                },
                &env(&api),
            );
        }

        let ids: Vec<_> = orders.orders().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["1735689600000", "1735689600000-1", "1735689600000-2"]);
    }

    #[tokio::test]
    async fn test_orders_effects_are_lifted() {
        let api = InMemoryOrderApi::new();
        let env = env(&api);
        let mut state = StorefrontState::new();
        let request = OrdersAction::load();
        let request_id = request.request_id().unwrap();

        let effects = reduce_all(&mut state, &env, [request.into()]);
        let results = resolve_effects(effects).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].completes_orders_request(request_id));
    }
}
