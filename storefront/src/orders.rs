//! Order store: the list of placed orders and their status transitions.
//!
//! Remote calls run as effects. A status change is applied only after the
//! backend confirmed it, so a failed call never has to be rolled back.

use crate::environment::StorefrontEnvironment;
use crate::error::ApiError;
use crate::types::{Order, OrderId, OrderStatus, RequestId};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use storefront_core::{SmallVec, async_effect, effect::Effect, reducer::Reducer, smallvec};
use storefront_macros::Action;

/// Progress of the last order list fetch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadStatus {
    /// Never fetched
    #[default]
    Idle,
    /// Fetch in flight
    Loading,
    /// Last fetch succeeded
    Succeeded,
    /// Last fetch failed
    Failed,
}

/// Orders placed by the user
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrdersState {
    orders: Vec<Order>,
    load_status: LoadStatus,
    last_error: Option<ApiError>,
    pending_updates: HashSet<OrderId>,
}

impl OrdersState {
    /// Creates an empty order list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All orders, oldest first
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Returns an order by id
    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.id == id)
    }

    /// Orders with the given status, in list order
    #[must_use]
    pub fn with_status(&self, status: OrderStatus) -> Vec<&Order> {
        self.orders.iter().filter(|o| o.status == status).collect()
    }

    /// Orders grouped by status
    ///
    /// Every status has an entry, so the groups partition the list.
    #[must_use]
    pub fn grouped_by_status(&self) -> BTreeMap<OrderStatus, Vec<&Order>> {
        let mut groups: BTreeMap<OrderStatus, Vec<&Order>> =
            OrderStatus::ALL.into_iter().map(|s| (s, Vec::new())).collect();
        for order in &self.orders {
            groups.entry(order.status).or_default().push(order);
        }
        groups
    }

    /// Number of orders awaiting payment (the orders tab badge)
    #[must_use]
    pub fn new_orders_count(&self) -> usize {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::New)
            .count()
    }

    /// Progress of the last fetch
    #[must_use]
    pub const fn load_status(&self) -> LoadStatus {
        self.load_status
    }

    /// Whether a fetch is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.load_status == LoadStatus::Loading
    }

    /// Last backend error, cleared by the next success
    #[must_use]
    pub const fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// Whether a status change for `id` awaits confirmation
    #[must_use]
    pub fn is_update_pending(&self, id: &OrderId) -> bool {
        self.pending_updates.contains(id)
    }

    fn get_mut(&mut self, id: &OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|order| &order.id == id)
    }
}

/// Order commands and the results of their remote calls
#[derive(Action, Clone, Debug, PartialEq, Eq)]
pub enum OrdersAction {
    // ========== Commands ==========
    /// Fetch the order list from the backend
    #[command]
    LoadOrders {
        /// Correlation id
        request_id: RequestId,
    },

    /// Move an order to `status`, which must be its next status
    #[command]
    UpdateStatus {
        /// Correlation id
        request_id: RequestId,
        /// Order to change
        order_id: OrderId,
        /// Requested status
        status: OrderStatus,
    },

    /// Shorthand for `UpdateStatus` to `Paid`
    #[command]
    PayOrder {
        /// Correlation id
        request_id: RequestId,
        /// Order to pay
        order_id: OrderId,
    },

    /// Shorthand for `UpdateStatus` to `Delivered`
    #[command]
    ReceiveOrder {
        /// Correlation id
        request_id: RequestId,
        /// Order received
        order_id: OrderId,
    },

    // ========== Events ==========
    /// Backend returned the order list
    #[event]
    OrdersLoaded {
        /// Correlation id
        request_id: RequestId,
        /// Orders as returned
        orders: Vec<Order>,
    },

    /// Fetching the order list failed
    #[event]
    OrdersLoadFailed {
        /// Correlation id
        request_id: RequestId,
        /// Failure
        error: ApiError,
    },

    /// Backend confirmed a status change
    #[event]
    StatusUpdated {
        /// Correlation id
        request_id: RequestId,
        /// Changed order
        order_id: OrderId,
        /// New status
        status: OrderStatus,
    },

    /// Backend rejected a status change
    #[event]
    StatusUpdateFailed {
        /// Correlation id
        request_id: RequestId,
        /// Order left unchanged
        order_id: OrderId,
        /// Failure
        error: ApiError,
    },

    /// A status change was not sent: unknown order, illegal transition, or
    /// another change still pending
    #[event]
    StatusUpdateSkipped {
        /// Correlation id
        request_id: RequestId,
        /// Order left unchanged
        order_id: OrderId,
    },

    /// A checkout produced a new order
    #[event]
    OrderPlaced {
        /// The new order
        order: Order,
    },
}

impl OrdersAction {
    /// `LoadOrders` with a fresh request id
    #[must_use]
    pub fn load() -> Self {
        Self::LoadOrders {
            request_id: RequestId::next(),
        }
    }

    /// `PayOrder` with a fresh request id
    #[must_use]
    pub fn pay(order_id: OrderId) -> Self {
        Self::PayOrder {
            request_id: RequestId::next(),
            order_id,
        }
    }

    /// `ReceiveOrder` with a fresh request id
    #[must_use]
    pub fn receive(order_id: OrderId) -> Self {
        Self::ReceiveOrder {
            request_id: RequestId::next(),
            order_id,
        }
    }

    /// Correlation id, if this action has one
    #[must_use]
    pub const fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::LoadOrders { request_id }
            | Self::UpdateStatus { request_id, .. }
            | Self::PayOrder { request_id, .. }
            | Self::ReceiveOrder { request_id, .. }
            | Self::OrdersLoaded { request_id, .. }
            | Self::OrdersLoadFailed { request_id, .. }
            | Self::StatusUpdated { request_id, .. }
            | Self::StatusUpdateFailed { request_id, .. }
            | Self::StatusUpdateSkipped { request_id, .. } => Some(*request_id),
            Self::OrderPlaced { .. } => None,
        }
    }

    /// Whether this is the final result of the request `id`
    #[must_use]
    pub fn completes(&self, id: RequestId) -> bool {
        self.is_event() && self.request_id() == Some(id)
    }
}

/// Reducer for the order list
#[derive(Clone, Debug, Default)]
pub struct OrdersReducer;

impl OrdersReducer {
    /// Creates a new `OrdersReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Why a status change cannot be sent, if it cannot
    fn check_update(
        state: &OrdersState,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), &'static str> {
        let Some(order) = state.get(order_id) else {
            return Err("unknown order");
        };

        if !order.status.can_transition_to(status) {
            return Err("not the next status");
        }

        if state.is_update_pending(order_id) {
            return Err("update already pending");
        }

        Ok(())
    }
}

impl Reducer for OrdersReducer {
    type State = OrdersState;
    type Action = OrdersAction;
    type Environment = StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            OrdersAction::LoadOrders { request_id } => {
                tracing::debug!(%request_id, "Loading orders");
                state.load_status = LoadStatus::Loading;

                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    Some(match api.fetch_orders().await {
                        Ok(orders) => OrdersAction::OrdersLoaded { request_id, orders },
                        Err(error) => OrdersAction::OrdersLoadFailed { request_id, error },
                    })
                }]
            }

            OrdersAction::UpdateStatus {
                request_id,
                order_id,
                status,
            } => {
                if let Err(reason) = Self::check_update(state, &order_id, status) {
                    tracing::debug!(%order_id, %status, reason, "Status update skipped");
                    return smallvec![async_effect! {
                        Some(OrdersAction::StatusUpdateSkipped { request_id, order_id })
                    }];
                }

                tracing::debug!(%order_id, %status, "Requesting status update");
                state.pending_updates.insert(order_id.clone());

                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    Some(match api.update_status(&order_id, status).await {
                        Ok(()) => OrdersAction::StatusUpdated { request_id, order_id, status },
                        Err(error) => OrdersAction::StatusUpdateFailed {
                            request_id,
                            order_id,
                            error,
                        },
                    })
                }]
            }

            OrdersAction::PayOrder {
                request_id,
                order_id,
            } => self.reduce(
                state,
                OrdersAction::UpdateStatus {
                    request_id,
                    order_id,
                    status: OrderStatus::Paid,
                },
                env,
            ),

            OrdersAction::ReceiveOrder {
                request_id,
                order_id,
            } => self.reduce(
                state,
                OrdersAction::UpdateStatus {
                    request_id,
                    order_id,
                    status: OrderStatus::Delivered,
                },
                env,
            ),

            // ========== Events ==========
            OrdersAction::OrdersLoaded { orders, .. } => {
                tracing::info!(count = orders.len(), "Orders loaded");
                state.orders = orders;
                state.load_status = LoadStatus::Succeeded;
                state.last_error = None;
                SmallVec::new()
            }

            OrdersAction::OrdersLoadFailed { error, .. } => {
                tracing::warn!(%error, "Loading orders failed");
                state.load_status = LoadStatus::Failed;
                state.last_error = Some(error);
                SmallVec::new()
            }

            OrdersAction::StatusUpdated {
                order_id, status, ..
            } => {
                state.pending_updates.remove(&order_id);
                let applied = match state.get_mut(&order_id) {
                    Some(order) if order.status.can_transition_to(status) => {
                        tracing::info!(
                            %order_id,
                            from = %order.status,
                            to = %status,
                            "Order status changed"
                        );
                        order.status = status;
                        true
                    }
                    Some(order) => {
                        tracing::warn!(
                            %order_id,
                            current = %order.status,
                            %status,
                            "Confirmed status no longer applies"
                        );
                        false
                    }
                    None => {
                        tracing::warn!(%order_id, "Confirmed status for unknown order");
                        false
                    }
                };
                if applied {
                    state.last_error = None;
                }
                SmallVec::new()
            }

            OrdersAction::StatusUpdateFailed {
                order_id, error, ..
            } => {
                tracing::warn!(%order_id, %error, "Status update failed");
                state.pending_updates.remove(&order_id);
                state.last_error = Some(error);
                SmallVec::new()
            }

            OrdersAction::StatusUpdateSkipped { .. } => SmallVec::new(),

            OrdersAction::OrderPlaced { order } => {
                if state.get(&order.id).is_some() {
                    tracing::debug!(order_id = %order.id, "Duplicate order ignored");
                } else {
                    tracing::info!(order_id = %order.id, total = %order.total, "Order placed");
                    state.orders.push(order);
                }
                SmallVec::new()
            }
        }
    }
}
