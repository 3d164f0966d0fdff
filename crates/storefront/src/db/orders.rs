//! Order queries for [`PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use bramble_core::{CartId, CartItemId, OrderId, OrderStatus, UserId};

use super::{OrderStore, PgStore, RepositoryError};
use crate::models::{CartItem, NewOrder, Order, OrderItem};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    items: Json<Vec<OrderItem>>,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::from_code(&row.status)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            total_price: row.total_price,
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LockedItemRow {
    id: CartItemId,
    quantity: i32,
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(
        &self,
        cart_id: CartId,
        order: NewOrder,
        consumed: &[CartItem],
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent checkouts of the same cart across processes.
        sqlx::query("SELECT id FROM carts WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(cart_id)
            .bind(order.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        // With the cart row locked, new items cannot be inserted (their
        // foreign key check waits on it); existing rows are locked here.
        let locked: Vec<(CartItemId, i32)> = sqlx::query_as::<_, LockedItemRow>(
            "SELECT id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(cart_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|row| (row.id, row.quantity))
        .collect();

        let mut expected: Vec<(CartItemId, i32)> =
            consumed.iter().map(|item| (item.id, item.quantity)).collect();
        expected.sort_unstable();
        if locked != expected {
            return Err(RepositoryError::Conflict(
                "cart changed during checkout".to_owned(),
            ));
        }

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (user_id, items, total_price, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, items, total_price, status, created_at
            ",
        )
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(order.total_price)
        .bind(OrderStatus::Pending.code())
        .fetch_one(&mut *tx)
        .await?;

        let ids: Vec<i32> = consumed.iter().map(|item| item.id.as_i32()).collect();
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND id = ANY($2)")
            .bind(cart_id)
            .bind(ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        row.try_into()
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, items, total_price, status, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn get_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, items, total_price, status, created_at
            FROM orders
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }
}
