//! Cart, checkout and order state for a storefront client.
//!
//! Screens dispatch actions and read selectors; everything that changes lives
//! in one [`StorefrontState`] owned by a store:
//!
//! - Cart of line items keyed by product id
//! - Checkout that turns the cart into a `New` order after the backend accepts it
//! - Order list with `New → Paid → Delivered` transitions confirmed by the backend
//! - Local session (who is signed in)
//!
//! # Quick Start
//!
//! ```no_run
//! use storefront::{InMemoryOrderApi, Product, Storefront};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storefront = Storefront::with_api(Arc::new(InMemoryOrderApi::new()));
//!
//! storefront.sign_in("ada@example.com", "secret").await?;
//! storefront.add_item(Product::new(1, "Mug", Decimal::new(950, 2))).await?;
//! storefront.add_item(Product::new(1, "Mug", Decimal::new(950, 2))).await?;
//!
//! let order = storefront.checkout().await?;
//! assert_eq!(order.total, Decimal::new(1900, 2));
//! assert!(storefront.cart_items().await.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cart;
pub mod checkout;
pub mod client;
pub mod config;
pub mod environment;
pub mod error;
pub mod mocks;
pub mod orders;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use api::HttpOrderApi;
pub use cart::{CartAction, CartReducer, CartState};
pub use checkout::{CheckoutStatus, StorefrontAction, StorefrontReducer, StorefrontState};
pub use client::{StatusChange, Storefront, StorefrontStore};
pub use config::Config;
pub use environment::{OrderApi, StorefrontEnvironment};
pub use error::{ApiError, CartError, CheckoutError, ConfigError, OrdersError, SessionError};
pub use mocks::InMemoryOrderApi;
pub use orders::{LoadStatus, OrdersAction, OrdersReducer, OrdersState};
pub use session::{SessionAction, SessionReducer, SessionState};
pub use types::{
    LineItem, Order, OrderId, OrderStatus, Product, ProductId, RequestId, UploadLine, UserProfile,
};
