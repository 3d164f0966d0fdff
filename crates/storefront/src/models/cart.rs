//! Cart domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bramble_core::{CartId, CartItemId, ProductId, UserId};

/// A user's cart. Every user has exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// One product line in a cart.
///
/// `product_id` references the catalog but is not checked by the store:
/// the product may have disappeared since the item was added.
/// `quantity` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
}
