//! Checkout and order history.
//!
//! Checkout turns the user's cart into an order:
//!
//! 1. Lock the cart and load its items; a missing or empty cart is rejected.
//! 2. Re-resolve every item against the catalog. Items whose product is gone
//!    are left out of the order and reported back in the receipt.
//! 3. Snapshot each resolved product (id, title, price, image) with its
//!    quantity. The order total is the sum of the snapshot lines.
//! 4. Write the order and remove the items it was built from in one
//!    transaction. If the cart changed since step 1 (another process added
//!    or updated an item), nothing is written.
//!
//! A catalog outage aborts before anything is written.

use serde::Serialize;
use tracing::instrument;

use bramble_core::{OrderId, ProductId, UserId};

use super::{CartLocks, ShopError};
use crate::catalog::CatalogReader;
use crate::db::{CartStore, OrderStore, RepositoryError};
use crate::models::{NewOrder, Order, OrderItem};

/// Outcome of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order: Order,
    /// Cart items left out because their product no longer exists.
    pub omitted: Vec<ProductId>,
}

/// Checkout and order lookups for one request.
pub struct CheckoutService<'a> {
    catalog: &'a dyn CatalogReader,
    carts: &'a dyn CartStore,
    orders: &'a dyn OrderStore,
    locks: &'a CartLocks,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        catalog: &'a dyn CatalogReader,
        carts: &'a dyn CartStore,
        orders: &'a dyn OrderStore,
        locks: &'a CartLocks,
    ) -> Self {
        Self {
            catalog,
            carts,
            orders,
            locks,
        }
    }

    /// Place an order for everything in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::EmptyCart` if the user has no cart or it has no
    /// items, `ShopError::CatalogUnavailable` if products cannot be resolved,
    /// `ShopError::AmountOverflow` if the total does not fit,
    /// `ShopError::CartChanged` if the cart was modified while the order was
    /// being built and `ShopError::Repository` if the order cannot be
    /// written. No state changes in any of these cases.
    #[instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<CheckoutReceipt, ShopError> {
        let cart = self
            .carts
            .find_cart(user_id)
            .await?
            .ok_or(ShopError::EmptyCart)?;
        let _guard = self.locks.acquire(cart.id).await;

        let items = self.carts.list_items(cart.id).await?;
        if items.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let mut snapshot = Vec::with_capacity(items.len());
        let mut omitted = Vec::new();
        for item in &items {
            match self.catalog.get_by_id(item.product_id.as_str()).await? {
                Some(product) => snapshot.push(OrderItem::snapshot(&product, item.quantity)),
                None => omitted.push(item.product_id.clone()),
            }
        }

        if !omitted.is_empty() {
            tracing::warn!(
                cart_id = %cart.id,
                omitted = ?omitted,
                "checkout omitted items whose product no longer exists"
            );
        }

        let new_order =
            NewOrder::from_snapshot(user_id, snapshot).ok_or(ShopError::AmountOverflow)?;

        let order = match self.orders.place_order(cart.id, new_order, &items).await {
            Ok(order) => order,
            Err(RepositoryError::Conflict(reason)) => {
                tracing::warn!(cart_id = %cart.id, %reason, "checkout aborted");
                return Err(ShopError::CartChanged);
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            order_id = %order.id,
            lines = order.items.len(),
            total = %order.total_price,
            "order placed"
        );

        Ok(CheckoutReceipt { order, omitted })
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if the store fails.
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, ShopError> {
        Ok(self.orders.list_orders(user_id).await?)
    }

    /// One of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::OrderNotFound` if the order does not exist or is
    /// not the user's.
    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order, ShopError> {
        self.orders
            .get_order(user_id, order_id)
            .await?
            .ok_or(ShopError::OrderNotFound(order_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use bramble_core::{CartId, OrderStatus};

    use super::*;
    use crate::catalog::tests::product;
    use crate::catalog::{CatalogError, InMemoryCatalog, Product};
    use crate::db::MemoryStore;
    use crate::services::CartService;

    /// Catalog that adds a product to a cart, bypassing the cart locks, on
    /// the first lookup. Stands in for a second storefront process writing
    /// between checkout's item listing and the order write.
    struct ConcurrentWriter<'a> {
        inner: &'a InMemoryCatalog,
        store: &'a MemoryStore,
        cart_id: CartId,
        product_id: ProductId,
        fired: AtomicBool,
    }

    #[async_trait]
    impl CatalogReader for ConcurrentWriter<'_> {
        async fn list_all(&self) -> Result<Vec<Product>, CatalogError> {
            self.inner.list_all().await
        }

        async fn get_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
            if !self.fired.swap(true, Ordering::SeqCst) {
                self.store
                    .increment_item(self.cart_id, &self.product_id)
                    .await
                    .unwrap();
            }
            self.inner.get_by_id(id).await
        }

        async fn get_by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
            self.inner.get_by_category(category).await
        }

        async fn search(&self, text: &str) -> Result<Vec<Product>, CatalogError> {
            self.inner.search(text).await
        }
    }

    const USER: UserId = UserId::new(1);

    struct Fixture {
        catalog: InMemoryCatalog,
        store: MemoryStore,
        locks: CartLocks,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                catalog: InMemoryCatalog::new(vec![
                    product("p1", "Teapot", "Kitchen", 2400),
                    product("p2", "Kettle", "Kitchen", 3900),
                ]),
                store: MemoryStore::new(),
                locks: CartLocks::new(),
            }
        }

        fn cart(&self) -> CartService<'_> {
            CartService::new(&self.catalog, &self.store, &self.locks)
        }

        fn checkout(&self) -> CheckoutService<'_> {
            CheckoutService::new(&self.catalog, &self.store, &self.store, &self.locks)
        }
    }

    #[tokio::test]
    async fn test_empty_cart_rejected_without_side_effects() {
        let fx = Fixture::new();
        fx.store.get_or_create_cart(USER).await.unwrap();
        let result = fx.checkout().checkout(USER).await;

        assert!(matches!(result, Err(ShopError::EmptyCart)));
        assert_eq!(fx.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_cart_is_empty_and_not_created() {
        let fx = Fixture::new();
        let result = fx.checkout().checkout(USER).await;

        assert!(matches!(result, Err(ShopError::EmptyCart)));
        assert!(fx.store.find_cart(USER).await.unwrap().is_none());
        assert_eq!(fx.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_item_added_mid_checkout_is_not_lost() {
        let fx = Fixture::new();
        fx.cart().add_item(USER, "p1").await.unwrap();
        let cart = fx.store.find_cart(USER).await.unwrap().unwrap();

        let writer = ConcurrentWriter {
            inner: &fx.catalog,
            store: &fx.store,
            cart_id: cart.id,
            product_id: ProductId::parse("p2").unwrap(),
            fired: AtomicBool::new(false),
        };
        let racing = CheckoutService::new(&writer, &fx.store, &fx.store, &fx.locks);

        assert!(matches!(
            racing.checkout(USER).await,
            Err(ShopError::CartChanged)
        ));
        assert_eq!(fx.store.order_count().await, 0);
        assert_eq!(fx.cart().item_count(USER).await.unwrap(), 2);

        let order = fx.checkout().checkout(USER).await.unwrap().order;
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total_price, Decimal::new(6300, 2));
        assert_eq!(fx.cart().item_count(USER).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overflowing_total_aborts() {
        let fx = Fixture::new();
        for id in ["big1", "big2"] {
            let mut p = product(id, "Big", "Kitchen", 100);
            p.price = Decimal::MAX / Decimal::TWO + Decimal::ONE;
            fx.catalog.insert(p).await;
        }
        fx.cart().add_item(USER, "big1").await.unwrap();
        fx.cart().add_item(USER, "big2").await.unwrap();

        let result = fx.checkout().checkout(USER).await;
        assert!(matches!(result, Err(ShopError::AmountOverflow)));
        assert_eq!(fx.cart().item_count(USER).await.unwrap(), 2);
        assert_eq!(fx.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_checkout_snapshots_and_clears() {
        let fx = Fixture::new();
        fx.cart().add_item(USER, "p1").await.unwrap();
        fx.cart().add_item(USER, "p1").await.unwrap();
        fx.cart().add_item(USER, "p2").await.unwrap();

        let receipt = fx.checkout().checkout(USER).await.unwrap();
        let order = receipt.order;

        assert!(receipt.omitted.is_empty());
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, Decimal::new(8700, 2));
        assert_eq!(fx.cart().item_count(USER).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_vanished_product_is_omitted() {
        let fx = Fixture::new();
        fx.cart().add_item(USER, "p1").await.unwrap();
        fx.cart().add_item(USER, "p2").await.unwrap();
        fx.catalog.remove(&ProductId::parse("p2").unwrap()).await;

        let receipt = fx.checkout().checkout(USER).await.unwrap();

        assert_eq!(receipt.order.items.len(), 1);
        assert_eq!(receipt.order.items.first().unwrap().product_id.as_str(), "p1");
        assert_eq!(receipt.omitted, vec![ProductId::parse("p2").unwrap()]);
        assert_eq!(receipt.order.total_price, Decimal::new(2400, 2));
        assert_eq!(fx.cart().item_count(USER).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_survives_catalog_changes() {
        let fx = Fixture::new();
        fx.cart().add_item(USER, "p1").await.unwrap();
        let order = fx.checkout().checkout(USER).await.unwrap().order;

        fx.catalog
            .insert(product("p1", "Renamed Teapot", "Kitchen", 9900))
            .await;
        fx.catalog.remove(&ProductId::parse("p1").unwrap()).await;

        let stored = fx.checkout().get_order(USER, order.id).await.unwrap();
        let line = stored.items.first().unwrap();
        assert_eq!(line.title, "Teapot");
        assert_eq!(line.price, Decimal::new(2400, 2));
    }

    #[tokio::test]
    async fn test_catalog_down_aborts() {
        let fx = Fixture::new();
        fx.cart().add_item(USER, "p1").await.unwrap();
        fx.catalog.set_offline(true);

        let result = fx.checkout().checkout(USER).await;
        assert!(matches!(result, Err(ShopError::CatalogUnavailable(_))));

        fx.catalog.set_offline(false);
        assert_eq!(fx.cart().item_count(USER).await.unwrap(), 1);
        assert_eq!(fx.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cart() {
        let fx = Fixture::new();
        fx.cart().add_item(USER, "p1").await.unwrap();
        fx.store.fail_orders(true);

        let result = fx.checkout().checkout(USER).await;
        assert!(matches!(result, Err(ShopError::Repository(_))));
        assert_eq!(fx.cart().item_count(USER).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_order_lookup_is_owner_scoped() {
        let fx = Fixture::new();
        fx.cart().add_item(USER, "p1").await.unwrap();
        let order = fx.checkout().checkout(USER).await.unwrap().order;

        assert!(matches!(
            fx.checkout().get_order(UserId::new(2), order.id).await,
            Err(ShopError::OrderNotFound(_))
        ));
        assert_eq!(fx.checkout().orders_for_user(USER).await.unwrap().len(), 1);
        assert!(
            fx.checkout()
                .orders_for_user(UserId::new(2))
                .await
                .unwrap()
                .is_empty()
        );
    }
}
