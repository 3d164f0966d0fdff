//! Order domain types.
//!
//! An order's items are a snapshot of the catalog taken at checkout. They are
//! stored as a JSON document alongside the order and are never re-derived
//! from the catalog afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bramble_core::{OrderId, OrderStatus, ProductId, UserId, line_total};

use crate::catalog::Product;

/// A purchased line, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub quantity: i32,
    pub image: String,
}

impl OrderItem {
    /// Copy the purchasable fields of `product` for `quantity` units.
    #[must_use]
    pub fn snapshot(product: &Product, quantity: i32) -> Self {
        Self {
            product_id: product.id.clone(),
            title: product.title.clone(),
            price: product.price,
            quantity,
            image: product.image.clone(),
        }
    }

    /// Price times quantity, or `None` if it overflows.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        line_total(self.price, self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// An order ready to be written. Created with status `Pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_price: Decimal,
}

impl NewOrder {
    /// Build an order whose total is the sum of its snapshot lines.
    ///
    /// Returns `None` if a line or the total does not fit in a `Decimal`.
    #[must_use]
    pub fn from_snapshot(user_id: UserId, items: Vec<OrderItem>) -> Option<Self> {
        let total_price = items
            .iter()
            .map(OrderItem::line_total)
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line?))?;
        Some(Self {
            user_id,
            items,
            total_price,
        })
    }
}
