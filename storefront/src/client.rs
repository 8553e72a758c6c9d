//! `Storefront`: the async facade screens talk to.
//!
//! Wraps a [`Store`] running the [`StorefrontReducer`]. Fire-and-forget
//! commands return once reduced; request/response operations (checkout,
//! order fetch, status changes) wait for their correlated result action.

use crate::api::HttpOrderApi;
use crate::cart::{CartAction, CartState};
use crate::checkout::{CheckoutStatus, StorefrontAction, StorefrontReducer, StorefrontState};
use crate::config::Config;
use crate::environment::{OrderApi, StorefrontEnvironment};
use crate::error::{ApiError, CartError, CheckoutError, OrdersError, SessionError};
use crate::orders::OrdersAction;
use crate::session::SessionAction;
use crate::types::{
    LineItem, Order, OrderId, OrderStatus, Product, ProductId, RequestId, UserProfile,
};
use metrics::{counter, describe_counter};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use storefront_runtime::{Store, StoreError};

/// Store type driving the storefront
pub type StorefrontStore =
    Store<StorefrontState, StorefrontAction, StorefrontEnvironment, StorefrontReducer>;

/// Checkouts that placed an order
pub const CHECKOUT_COMPLETED: &str = "storefront.checkout.completed";
/// Checkouts whose upload failed
pub const CHECKOUT_FAILED: &str = "storefront.checkout.failed";
/// Checkouts refused before upload
pub const CHECKOUT_REJECTED: &str = "storefront.checkout.rejected";

/// Register descriptions for runtime and storefront metrics
pub fn describe_metrics() {
    storefront_runtime::metrics::describe_metrics();
    describe_counter!(CHECKOUT_COMPLETED, "Checkouts that placed an order");
    describe_counter!(CHECKOUT_FAILED, "Checkouts whose order upload failed");
    describe_counter!(CHECKOUT_REJECTED, "Checkouts refused before upload");
}

/// Outcome of a status change request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusChange {
    /// Backend confirmed; the order now has this status
    Applied(OrderStatus),
    /// Nothing was sent: unknown order, not the next status, or a change
    /// already pending
    Skipped,
}

/// Storefront client facade
///
/// Cheap to clone; clones share one store.
///
/// # Example
///
/// ```ignore
/// let storefront = Storefront::new(StorefrontEnvironment::with_system_clock(api));
/// storefront.sign_in("ada@example.com", "secret").await?;
/// storefront.add_item(product).await?;
/// let order = storefront.checkout().await?;
/// storefront.pay_order(order.id).await?;
/// ```
#[derive(Clone)]
pub struct Storefront {
    store: StorefrontStore,
    action_timeout: Duration,
}

impl Storefront {
    /// Creates a storefront with an empty cart, no orders, and no user
    #[must_use]
    pub fn new(environment: StorefrontEnvironment) -> Self {
        Self {
            store: Store::new(StorefrontState::new(), StorefrontReducer::new(), environment),
            action_timeout: Config::default().action_timeout,
        }
    }

    /// Creates a storefront backed by any [`OrderApi`] and the system clock
    #[must_use]
    pub fn with_api(api: Arc<dyn OrderApi>) -> Self {
        Self::new(StorefrontEnvironment::with_system_clock(api))
    }

    /// Creates a storefront talking to the HTTP backend from `config`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let api = HttpOrderApi::from_config(&config.api)?;
        Ok(Self::with_api(Arc::new(api)).with_action_timeout(config.action_timeout))
    }

    /// Sets how long request/response calls wait for their result
    #[must_use]
    pub const fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// The underlying store, for observers and custom actions
    #[must_use]
    pub const fn store(&self) -> &StorefrontStore {
        &self.store
    }

    // ========== Cart ==========

    /// Add one unit of `product`
    ///
    /// # Errors
    ///
    /// - [`CartError::Locked`]: A checkout is in flight; the cart is unchanged
    /// - [`CartError::Store`]: The store is shutting down
    pub async fn add_item(&self, product: Product) -> Result<(), CartError> {
        self.send_cart(CartAction::AddItem { product }).await
    }

    /// Remove a product from the cart
    ///
    /// # Errors
    ///
    /// See [`Storefront::add_item`].
    pub async fn remove_item(&self, id: ProductId) -> Result<(), CartError> {
        self.send_cart(CartAction::RemoveItem { id }).await
    }

    /// Add one unit of a product already in the cart
    ///
    /// # Errors
    ///
    /// See [`Storefront::add_item`].
    pub async fn increment_quantity(&self, id: ProductId) -> Result<(), CartError> {
        self.send_cart(CartAction::IncrementQuantity { id }).await
    }

    /// Remove one unit of a product
    ///
    /// # Errors
    ///
    /// See [`Storefront::add_item`].
    pub async fn decrement_quantity(&self, id: ProductId) -> Result<(), CartError> {
        self.send_cart(CartAction::DecrementQuantity { id }).await
    }

    async fn send_cart(&self, action: CartAction) -> Result<(), CartError> {
        // Only checkout sets the in-flight status, so seeing it after a cart
        // action means the reducer refused the edit
        let (_, locked) = self
            .store
            .send_and_inspect(action.into(), |s| s.checkout.is_in_flight())
            .await?;

        if locked {
            Err(CartError::Locked)
        } else {
            Ok(())
        }
    }

    // ========== Session ==========

    /// Sign in
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the credentials do not validate.
    pub async fn sign_in(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<UserProfile, SessionError> {
        self.send_session(SessionAction::SignIn {
            email: email.into(),
            password: password.into(),
        })
        .await
    }

    /// Create an account and sign in
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if any field does not validate.
    pub async fn sign_up(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<UserProfile, SessionError> {
        self.send_session(SessionAction::SignUp {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        })
        .await
    }

    /// Merge new profile fields into the signed-in user
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotSignedIn`]: Nobody is signed in
    /// - [`SessionError::InvalidEmail`]: The new email does not validate
    /// - [`SessionError::Store`]: The store is shutting down
    pub async fn update_profile(
        &self,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<UserProfile, SessionError> {
        self.send_session(SessionAction::UpdateProfile { name, email })
            .await
    }

    /// Sign out
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn sign_out(&self) -> Result<(), StoreError> {
        self.send(SessionAction::SignOut).await
    }

    /// Send a session action and read its outcome under the same lock
    async fn send_session(&self, action: SessionAction) -> Result<UserProfile, SessionError> {
        let (_, outcome) = self
            .store
            .send_and_inspect(action.into(), |s| {
                match (s.session.error(), s.session.user()) {
                    (Some(error), _) => Err(error.clone()),
                    (None, Some(user)) => Ok(user.clone()),
                    (None, None) => Err(SessionError::NotSignedIn),
                }
            })
            .await?;
        outcome
    }

    // ========== Checkout ==========

    /// Turn the cart into an order
    ///
    /// On success the cart is empty and the returned order is in the order
    /// list with status `New`.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::NotAuthenticated`]: Nobody is signed in
    /// - [`CheckoutError::EmptyCart`]: Nothing to order
    /// - [`CheckoutError::AlreadyInFlight`]: Another checkout is running
    /// - [`CheckoutError::Remote`]: The upload failed; the cart is unchanged
    /// - [`CheckoutError::Store`]: Timeout or shutdown
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self) -> Result<Order, CheckoutError> {
        let request_id = RequestId::next();

        let result = self
            .store
            .send_and_wait_for(
                StorefrontAction::Checkout { request_id },
                |action| action.completes_checkout(request_id),
                self.action_timeout,
            )
            .await?;

        match result {
            StorefrontAction::CheckoutSucceeded { order_id, .. } => {
                counter!(CHECKOUT_COMPLETED).increment(1);
                self.order(&order_id)
                    .await
                    .ok_or_else(|| CheckoutError::Store(format!("order {order_id} missing")))
            }
            StorefrontAction::CheckoutFailed { error, .. } => {
                counter!(CHECKOUT_FAILED).increment(1);
                Err(CheckoutError::Remote(error))
            }
            StorefrontAction::CheckoutRejected { reason, .. } => {
                counter!(CHECKOUT_REJECTED).increment(1);
                Err(reason)
            }
            other => Err(CheckoutError::Store(format!(
                "unexpected result {}",
                other.name()
            ))),
        }
    }

    // ========== Orders ==========

    /// Fetch the order list, replacing the local one
    ///
    /// Returns the number of orders. On failure the local list is kept.
    ///
    /// # Errors
    ///
    /// Returns [`OrdersError::Remote`] if the fetch failed.
    pub async fn load_orders(&self) -> Result<usize, OrdersError> {
        let request_id = RequestId::next();

        match self
            .orders_request(OrdersAction::LoadOrders { request_id }, request_id)
            .await?
        {
            OrdersAction::OrdersLoaded { orders, .. } => Ok(orders.len()),
            OrdersAction::OrdersLoadFailed { error, .. } => Err(OrdersError::Remote(error)),
            other => Err(OrdersError::Store(format!("unexpected result {}", other.name()))),
        }
    }

    /// Move an order to `status`
    ///
    /// Only the next status in `New → Paid → Delivered` is sent; anything
    /// else is [`StatusChange::Skipped`].
    ///
    /// # Errors
    ///
    /// Returns [`OrdersError::Remote`] if the backend refused; the local
    /// status is unchanged.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<StatusChange, OrdersError> {
        let request_id = RequestId::next();
        let action = OrdersAction::UpdateStatus {
            request_id,
            order_id,
            status,
        };

        match self.orders_request(action, request_id).await? {
            OrdersAction::StatusUpdated { status, .. } => Ok(StatusChange::Applied(status)),
            OrdersAction::StatusUpdateSkipped { .. } => Ok(StatusChange::Skipped),
            OrdersAction::StatusUpdateFailed { error, .. } => Err(OrdersError::Remote(error)),
            other => Err(OrdersError::Store(format!("unexpected result {}", other.name()))),
        }
    }

    /// Mark a `New` order as paid
    ///
    /// # Errors
    ///
    /// See [`Storefront::update_status`].
    pub async fn pay_order(&self, order_id: OrderId) -> Result<StatusChange, OrdersError> {
        self.update_status(order_id, OrderStatus::Paid).await
    }

    /// Mark a `Paid` order as delivered
    ///
    /// # Errors
    ///
    /// See [`Storefront::update_status`].
    pub async fn receive_order(&self, order_id: OrderId) -> Result<StatusChange, OrdersError> {
        self.update_status(order_id, OrderStatus::Delivered).await
    }

    async fn orders_request(
        &self,
        action: OrdersAction,
        request_id: RequestId,
    ) -> Result<OrdersAction, OrdersError> {
        let result = self
            .store
            .send_and_wait_for(
                StorefrontAction::Orders(action),
                |a| a.completes_orders_request(request_id),
                self.action_timeout,
            )
            .await?;

        match result {
            StorefrontAction::Orders(action) => Ok(action),
            other => Err(OrdersError::Store(format!("unexpected result {}", other.name()))),
        }
    }

    // ========== Selectors ==========

    /// Read any part of the state
    pub async fn select<T>(&self, f: impl FnOnce(&StorefrontState) -> T) -> T {
        self.store.state(f).await
    }

    /// Copy of the cart
    pub async fn cart(&self) -> CartState {
        self.select(|s| s.cart.clone()).await
    }

    /// Cart line items in insertion order
    pub async fn cart_items(&self) -> Vec<LineItem> {
        self.select(|s| s.cart.items().to_vec()).await
    }

    /// Sum of cart quantities
    pub async fn cart_total_quantity(&self) -> u32 {
        self.select(|s| s.cart.total_quantity()).await
    }

    /// Cart total, rounded to cents
    pub async fn cart_total_price(&self) -> Decimal {
        self.select(|s| s.cart.total_price()).await
    }

    /// All orders
    pub async fn orders(&self) -> Vec<Order> {
        self.select(|s| s.orders.orders().to_vec()).await
    }

    /// One order by id
    pub async fn order(&self, id: &OrderId) -> Option<Order> {
        self.select(|s| s.orders.get(id).cloned()).await
    }

    /// Orders with the given status
    pub async fn orders_with_status(&self, status: OrderStatus) -> Vec<Order> {
        self.select(|s| s.orders.with_status(status).into_iter().cloned().collect())
            .await
    }

    /// Number of unpaid orders
    pub async fn new_orders_count(&self) -> usize {
        self.select(|s| s.orders.new_orders_count()).await
    }

    /// Checkout progress
    pub async fn checkout_status(&self) -> CheckoutStatus {
        self.select(|s| s.checkout.clone()).await
    }

    /// Whether someone is signed in
    pub async fn is_authenticated(&self) -> bool {
        self.select(|s| s.session.is_authenticated()).await
    }

    /// The signed-in user
    pub async fn user(&self) -> Option<UserProfile> {
        self.select(|s| s.session.user().cloned()).await
    }

    /// Stop accepting actions and wait for in-flight remote calls
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if calls are still running
    /// after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }

    async fn send(&self, action: impl Into<StorefrontAction>) -> Result<(), StoreError> {
        self.store.send(action.into()).await.map(|_| ())
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("action_timeout", &self.action_timeout)
            .finish_non_exhaustive()
    }
}
