//! Cart store: line items keyed by product id, in insertion order.
//!
//! The cart reducer is pure and never produces effects. Unknown ids are
//! no-ops rather than errors.

use crate::types::{LineItem, Product, ProductId, round_money};
use rust_decimal::Decimal;
use storefront_core::{SmallVec, effect::Effect, reducer::Reducer};
use storefront_macros::Action;

/// Cart contents
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CartState {
    items: Vec<LineItem>,
}

impl CartState {
    /// Creates an empty cart
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Line items in the order they were first added
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns a line item by product id
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Sum of quantities (the cart badge)
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of `price × quantity`, rounded to cents
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        round_money(self.items.iter().map(LineItem::subtotal).sum())
    }

    /// Whether the cart has no items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct products
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    fn get_mut(&mut self, id: &ProductId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }
}

/// Cart commands
#[derive(Action, Clone, Debug, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a product
    #[command]
    AddItem {
        /// Product to add
        product: Product,
    },

    /// Remove a product entirely
    #[command]
    RemoveItem {
        /// Product id
        id: ProductId,
    },

    /// Add one unit of a product already in the cart
    #[command]
    IncrementQuantity {
        /// Product id
        id: ProductId,
    },

    /// Remove one unit; the line goes away at quantity 1
    #[command]
    DecrementQuantity {
        /// Product id
        id: ProductId,
    },

    /// Empty the cart
    #[command]
    Clear,
}

/// Reducer for the cart
#[derive(Clone, Debug, Default)]
pub struct CartReducer;

impl CartReducer {
    /// Creates a new `CartReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for CartReducer {
    type State = CartState;
    type Action = CartAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CartAction::AddItem { product } => {
                if let Some(item) = state.get_mut(&product.id) {
                    item.quantity += 1;
                    tracing::debug!(
                        id = %item.id,
                        quantity = item.quantity,
                        "Cart item quantity increased"
                    );
                } else {
                    tracing::debug!(id = %product.id, "Cart item added");
                    state.items.push(LineItem::from_product(product));
                }
            }

            CartAction::RemoveItem { id } => {
                let before = state.items.len();
                state.items.retain(|item| item.id != id);
                if state.items.len() == before {
                    tracing::debug!(%id, "Remove ignored: not in cart");
                } else {
                    tracing::debug!(%id, "Cart item removed");
                }
            }

            CartAction::IncrementQuantity { id } => match state.get_mut(&id) {
                Some(item) => {
                    item.quantity += 1;
                    tracing::debug!(%id, quantity = item.quantity, "Cart item incremented");
                }
                None => tracing::debug!(%id, "Increment ignored: not in cart"),
            },

            CartAction::DecrementQuantity { id } => {
                let Some(index) = state.items.iter().position(|item| item.id == id) else {
                    tracing::debug!(%id, "Decrement ignored: not in cart");
                    return SmallVec::new();
                };

                let item = &mut state.items[index];
                if item.quantity > 1 {
                    item.quantity -= 1;
                    tracing::debug!(%id, quantity = item.quantity, "Cart item decremented");
                } else {
                    state.items.remove(index);
                    tracing::debug!(%id, "Cart item removed at quantity 1");
                }
            }

            CartAction::Clear => {
                tracing::debug!(items = state.items.len(), "Cart cleared");
                state.items.clear();
            }
        }

        SmallVec::new()
    }
}
