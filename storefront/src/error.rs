//! Error types for the storefront state layer

use storefront_runtime::StoreError;
use thiserror::Error;

/// Errors from the order backend
///
/// Cloneable so it can travel inside result actions and stay in state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("API error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Response body could not be decoded
    #[error("Response parsing failed: {0}")]
    Decode(String),

    /// Backend is not reachable
    #[error("Order service unavailable: {0}")]
    Unavailable(String),
}

/// Why a cart edit was not applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// A checkout is uploading the cart; edits wait until it finishes
    #[error("Cart is locked while a checkout is in progress")]
    Locked,

    /// The store rejected the action
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for CartError {
    fn from(error: StoreError) -> Self {
        Self::Store(error.to_string())
    }
}

/// Why a checkout did not produce an order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// No user is signed in
    #[error("Sign in before checking out")]
    NotAuthenticated,

    /// The cart has no items
    #[error("Cart is empty")]
    EmptyCart,

    /// Another checkout has not finished yet
    #[error("A checkout is already in progress")]
    AlreadyInFlight,

    /// Order upload failed
    #[error("Order upload failed: {0}")]
    Remote(#[from] ApiError),

    /// The store did not deliver a result
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for CheckoutError {
    fn from(error: StoreError) -> Self {
        Self::Store(error.to_string())
    }
}

/// Errors from order list operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrdersError {
    /// Backend call failed
    #[error("Order service error: {0}")]
    Remote(#[from] ApiError),

    /// The store did not deliver a result
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for OrdersError {
    fn from(error: StoreError) -> Self {
        Self::Store(error.to_string())
    }
}

/// Session validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Email has no `@`
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Password was empty
    #[error("Password cannot be empty")]
    EmptyPassword,

    /// Sign-up name was empty
    #[error("Name cannot be empty")]
    EmptyName,

    /// Profile changes need a signed-in user
    #[error("Nobody is signed in")]
    NotSignedIn,

    /// The store rejected the action
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for SessionError {
    fn from(error: StoreError) -> Self {
        Self::Store(error.to_string())
    }
}

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A numeric variable did not parse
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },

    /// A URL variable did not parse
    #[error("{var} is not a valid http(s) URL ({value:?}): {reason}")]
    InvalidUrl {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },
}
