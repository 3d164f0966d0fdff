//! Database operations for the storefront `PostgreSQL`.
//!
//! # Database: `bramble_storefront`
//!
//! Holds everything the storefront owns. Products are not here; they live in
//! the catalog database and are read through [`crate::catalog`].
//!
//! ## Tables
//!
//! - `users` / `user_passwords` - Site accounts
//! - `carts` - One row per user
//! - `cart_items` - Product lines, unique per (cart, product)
//! - `orders` - Placed orders with their item snapshot as JSONB
//! - `tower_sessions.session` - Session storage
//!
//! # Stores
//!
//! Access goes through the [`CartStore`], [`OrderStore`] and [`UserStore`]
//! traits so services can run against [`PgStore`] in deployment and
//! [`MemoryStore`] in tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bramble-cli -- migrate store
//! ```

mod carts;
mod memory;
mod orders;
mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bramble_core::{CartId, CartItemId, Email, OrderId, ProductId, UserId};

use crate::models::{Cart, CartItem, NewOrder, Order, User};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Cart and cart-item persistence.
///
/// Item operations take the owning `cart_id` and never touch items in other
/// carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Return the user's cart, creating an empty one on first access.
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// The user's cart, if one exists. Never creates.
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Items in the cart, oldest first.
    async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Add one unit of `product_id`: insert with quantity 1, or increment the
    /// existing line. Atomic with respect to concurrent calls.
    async fn increment_item(
        &self,
        cart_id: CartId,
        product_id: &ProductId,
    ) -> Result<CartItem, RepositoryError>;

    /// Set an item's quantity exactly.
    ///
    /// Returns `Conflict` if `quantity < 1` and `NotFound` if the item is not
    /// in the cart.
    async fn set_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError>;

    /// Delete an item. Returns whether a row was removed.
    async fn delete_item(&self, cart_id: CartId, item_id: CartItemId)
    -> Result<bool, RepositoryError>;

    /// Number of distinct items in the cart.
    async fn count_items(&self, cart_id: CartId) -> Result<i64, RepositoryError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert `order` with status `Pending` and delete the `consumed` items
    /// from `cart_id`, as one atomic step.
    ///
    /// `consumed` is the item list the order was built from. If the cart no
    /// longer holds exactly those items at those quantities, nothing is
    /// written and `Conflict` is returned. Returns `NotFound` if the cart
    /// does not belong to `order.user_id`.
    async fn place_order(
        &self,
        cart_id: CartId,
        order: NewOrder,
        consumed: &[CartItem],
    ) -> Result<Order, RepositoryError>;

    /// The user's orders, newest first.
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// One order, only if it belongs to `user_id`.
    async fn get_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user with a password hash, along with their empty cart.
    ///
    /// Returns `Conflict` if the email is taken.
    async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// The user and stored password hash for an email, if both exist.
    async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}

/// `PostgreSQL` implementation of every storefront store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

fn parse_product_id(raw: &str) -> Result<ProductId, RepositoryError> {
    ProductId::parse(raw).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid product id in database: {e}"))
    })
}
