//! Shop service error types.

use thiserror::Error;

use bramble_core::{CartItemId, OrderId};

use crate::catalog::CatalogError;
use crate::db::RepositoryError;

/// Errors raised by cart and checkout operations.
#[derive(Debug, Error)]
pub enum ShopError {
    /// The product does not resolve in the catalog.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// The cart item does not exist or belongs to someone else.
    #[error("cart item not found: {0}")]
    CartItemNotFound(CartItemId),

    /// The order does not exist or belongs to someone else.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Checkout was attempted on a cart with no items.
    #[error("cart is empty")]
    EmptyCart,

    /// Requested quantity is above the per-line limit.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i32),

    /// A price total does not fit in a `Decimal`.
    #[error("amount overflow")]
    AmountOverflow,

    /// The cart changed between reading it and placing the order.
    #[error("cart changed during checkout")]
    CartChanged,

    /// The catalog could not be read.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
