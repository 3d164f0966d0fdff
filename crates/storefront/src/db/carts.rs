//! Cart queries for [`PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bramble_core::{CartId, CartItemId, ProductId, UserId};

use super::{CartStore, PgStore, RepositoryError, parse_product_id};
use crate::models::{Cart, CartItem};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    cart_id: CartId,
    product_id: String,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: parse_product_id(&row.product_id)?,
            quantity: row.quantity,
        })
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        // Concurrent first requests race on the insert; the unique user_id
        // constraint leaves exactly one row.
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, cart_id, product_id, quantity
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY id
            ",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    async fn increment_item(
        &self,
        cart_id: CartId,
        product_id: &ProductId,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, 1)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + 1
            RETURNING id, cart_id, product_id, quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn set_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        if quantity < 1 {
            return Err(RepositoryError::Conflict(format!(
                "quantity must be at least 1, got {quantity}"
            )));
        }

        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            UPDATE cart_items SET quantity = $3
            WHERE id = $1 AND cart_id = $2
            RETURNING id, cart_id, product_id, quantity
            ",
        )
        .bind(item_id)
        .bind(cart_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_items(&self, cart_id: CartId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
