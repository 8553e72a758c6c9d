//! Declarative macro for effect construction
//!
//! Reducers in the storefront mostly return a single async effect wrapping a
//! remote call. `async_effect!` keeps that boilerplate out of the match arms.

/// Create an `Effect::Future` from an async block
///
/// The block evaluates to `Option<Action>`. Captured values are moved in.
///
/// # Example
///
/// ```
/// use storefront_core::{async_effect, effect::Effect};
///
/// #[derive(Debug)]
/// enum OrdersAction {
///     Loaded { count: usize },
/// }
///
/// let count = 3;
/// let effect: Effect<OrdersAction> = async_effect! {
///     Some(OrdersAction::Loaded { count })
/// };
/// assert!(matches!(effect, Effect::Future(_)));
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}
