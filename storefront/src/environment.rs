//! Injected dependencies: the order backend and the clock.

use crate::error::ApiError;
use crate::types::{Order, OrderId, OrderStatus};
use futures::future::BoxFuture;
use std::sync::Arc;
use storefront_core::environment::{Clock, SystemClock};

/// Future returned by [`OrderApi`] methods
pub type ApiFuture<'a, T> = BoxFuture<'a, Result<T, ApiError>>;

/// Remote order backend
///
/// Methods return boxed futures so the trait stays dyn-compatible and can be
/// shared as `Arc<dyn OrderApi>`.
///
/// # Example
///
/// ```ignore
/// let api: Arc<dyn OrderApi> = Arc::new(HttpOrderApi::new("http://localhost:3000/api")?);
/// let orders = api.fetch_orders().await?;
/// ```
pub trait OrderApi: Send + Sync {
    /// Upload a new order
    ///
    /// Only the order's [`upload_lines`](Order::upload_lines) go over the
    /// wire; backends that keep orders store the whole snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the backend rejects the order or is unreachable.
    fn upload_order<'a>(&'a self, order: &'a Order) -> ApiFuture<'a, ()>;

    /// Fetch all orders of the signed-in user
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body does not decode.
    fn fetch_orders(&self) -> ApiFuture<'_, Vec<Order>>;

    /// Change the status of an order
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the backend rejects the change or is unreachable.
    fn update_status<'a>(
        &'a self,
        order_id: &'a OrderId,
        status: OrderStatus,
    ) -> ApiFuture<'a, ()>;
}

/// Environment for the storefront reducers
#[derive(Clone)]
pub struct StorefrontEnvironment {
    /// Order backend
    pub api: Arc<dyn OrderApi>,
    /// Clock for order ids and timestamps
    pub clock: Arc<dyn Clock>,
}

impl StorefrontEnvironment {
    /// Creates an environment with the given backend and clock
    #[must_use]
    pub fn new(api: Arc<dyn OrderApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }

    /// Creates an environment using the system clock
    #[must_use]
    pub fn with_system_clock(api: Arc<dyn OrderApi>) -> Self {
        Self::new(api, Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for StorefrontEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontEnvironment").finish_non_exhaustive()
    }
}
