//! In-memory order backend for the demo binary and tests.

use crate::environment::{ApiFuture, OrderApi};
use crate::error::ApiError;
use crate::types::{Order, OrderId, OrderStatus, UploadLine};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Thread-safe in-memory [`OrderApi`] with failure injection
///
/// Clones share the same backend, so a test can keep one clone for
/// assertions while the store owns another.
///
/// # Example
///
/// ```
/// use storefront::mocks::InMemoryOrderApi;
/// use storefront::error::ApiError;
///
/// let api = InMemoryOrderApi::new();
/// api.fail_next(ApiError::Unavailable("maintenance".into()));
/// assert_eq!(api.upload_count(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryOrderApi {
    backend: Arc<RwLock<Backend>>,
}

#[derive(Debug, Default)]
struct Backend {
    orders: Vec<Order>,
    uploads: Vec<Vec<UploadLine>>,
    status_updates: Vec<(OrderId, OrderStatus)>,
    failure: Option<ApiError>,
    one_shot_failures: VecDeque<ApiError>,
    latency: Duration,
}

impl Backend {
    fn take_failure(&mut self) -> Option<ApiError> {
        self.one_shot_failures
            .pop_front()
            .or_else(|| self.failure.clone())
    }
}

impl InMemoryOrderApi {
    /// Creates an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the orders returned by `fetch_orders`
    ///
    /// Uploaded orders are appended to these.
    #[must_use]
    pub fn with_orders(self, orders: Vec<Order>) -> Self {
        self.write().orders = orders;
        self
    }

    /// Delays every call by `latency`
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.write().latency = latency;
        self
    }

    /// Fails every call with `error` until [`recover`](Self::recover)
    pub fn fail_with(&self, error: ApiError) {
        self.write().failure = Some(error);
    }

    /// Fails only the next call with `error`
    pub fn fail_next(&self, error: ApiError) {
        self.write().one_shot_failures.push_back(error);
    }

    /// Clears all injected failures
    pub fn recover(&self) {
        let mut backend = self.write();
        backend.failure = None;
        backend.one_shot_failures.clear();
    }

    /// Every successful upload, oldest first
    #[must_use]
    pub fn uploads(&self) -> Vec<Vec<UploadLine>> {
        self.read().uploads.clone()
    }

    /// Number of successful uploads
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.read().uploads.len()
    }

    /// Every successful status change, oldest first
    #[must_use]
    pub fn status_updates(&self) -> Vec<(OrderId, OrderStatus)> {
        self.read().status_updates.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Backend> {
        self.backend.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Backend> {
        self.backend.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        let latency = self.read().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl OrderApi for InMemoryOrderApi {
    fn upload_order<'a>(&'a self, order: &'a Order) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.simulate_latency().await;

            let mut backend = self.write();
            if let Some(error) = backend.take_failure() {
                return Err(error);
            }
            backend.uploads.push(order.upload_lines());
            if !backend.orders.iter().any(|o| o.id == order.id) {
                let mut stored = order.clone();
                stored.status = OrderStatus::New;
                backend.orders.push(stored);
            }
            Ok(())
        })
    }

    fn fetch_orders(&self) -> ApiFuture<'_, Vec<Order>> {
        Box::pin(async move {
            self.simulate_latency().await;

            let mut backend = self.write();
            if let Some(error) = backend.take_failure() {
                return Err(error);
            }
            Ok(backend.orders.clone())
        })
    }

    fn update_status<'a>(
        &'a self,
        order_id: &'a OrderId,
        status: OrderStatus,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.simulate_latency().await;

            let mut backend = self.write();
            if let Some(error) = backend.take_failure() {
                return Err(error);
            }
            if let Some(order) = backend.orders.iter_mut().find(|o| &o.id == order_id) {
                order.status = status;
            }
            backend.status_updates.push((order_id.clone(), status));
            Ok(())
        })
    }
}
