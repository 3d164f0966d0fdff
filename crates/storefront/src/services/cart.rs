//! Cart operations.
//!
//! Wraps a [`CartStore`] with catalog validation and per-cart locking. Every
//! operation is keyed by the signed-in user; carts are created on first use.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use bramble_core::{CartItemId, ProductId, UserId, format_price, line_total, sum_amounts};

use super::{CartLocks, ShopError};
use crate::catalog::{CatalogReader, Product};
use crate::db::{CartStore, RepositoryError};
use crate::models::{Cart, CartItem};

/// Largest quantity a single cart line may be set to.
pub const MAX_ITEM_QUANTITY: i32 = 999;

/// Result of adding a product to the cart.
#[derive(Debug, Clone)]
pub struct AddedItem {
    pub item: CartItem,
    pub product: Product,
    /// Distinct items in the cart after the add.
    pub cart_item_count: i64,
}

/// A cart item paired with its current catalog product, if it still resolves.
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub item: CartItem,
    pub product: Option<Product>,
}

impl ResolvedLine {
    /// Current price times quantity; zero when the product is gone.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::AmountOverflow` if the amount does not fit in a
    /// `Decimal`.
    pub fn line_total(&self) -> Result<Decimal, ShopError> {
        self.product.as_ref().map_or(Ok(Decimal::ZERO), |p| {
            line_total(p.price, self.item.quantity).ok_or(ShopError::AmountOverflow)
        })
    }
}

/// One row of the cart page.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    /// False when the product no longer resolves in the catalog.
    pub available: bool,
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub image: Option<String>,
    pub line_total: Decimal,
}

impl TryFrom<ResolvedLine> for CartLine {
    type Error = ShopError;

    fn try_from(line: ResolvedLine) -> Result<Self, Self::Error> {
        let total = line.line_total()?;
        let ResolvedLine { item, product } = line;
        Ok(Self {
            item_id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            available: product.is_some(),
            title: product.as_ref().map(|p| p.title.clone()),
            price: product.as_ref().map(|p| p.price),
            image: product.map(|p| p.image),
            line_total: total,
        })
    }
}

/// The cart page.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total_price: Decimal,
    /// `total_price` formatted for display, e.g. `$12.50`.
    pub display_total: String,
    pub item_count: i64,
}

/// Cart operations for one request.
pub struct CartService<'a> {
    catalog: &'a dyn CatalogReader,
    carts: &'a dyn CartStore,
    locks: &'a CartLocks,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(
        catalog: &'a dyn CatalogReader,
        carts: &'a dyn CartStore,
        locks: &'a CartLocks,
    ) -> Self {
        Self {
            catalog,
            carts,
            locks,
        }
    }

    /// The user's cart, created if missing.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if the store fails.
    pub async fn cart_for(&self, user_id: UserId) -> Result<Cart, ShopError> {
        Ok(self.carts.get_or_create_cart(user_id).await?)
    }

    /// Add one unit of a product, creating the line or incrementing it.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::ProductNotFound` if the product does not resolve
    /// (including malformed IDs) and `ShopError::CatalogUnavailable` if the
    /// catalog cannot be read. The cart is unchanged in both cases.
    #[instrument(skip(self))]
    pub async fn add_item(&self, user_id: UserId, product_id: &str) -> Result<AddedItem, ShopError> {
        let product = self
            .catalog
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| ShopError::ProductNotFound(product_id.to_owned()))?;

        let cart = self.cart_for(user_id).await?;
        let _guard = self.locks.acquire(cart.id).await;

        let item = self.carts.increment_item(cart.id, &product.id).await?;
        let cart_item_count = self.carts.count_items(cart.id).await?;

        tracing::info!(
            cart_id = %cart.id,
            product_id = %product.id,
            quantity = item.quantity,
            "added to cart"
        );

        Ok(AddedItem {
            item,
            product,
            cart_item_count,
        })
    }

    /// Set an item's quantity. Anything below 1 removes the item.
    ///
    /// Returns the updated item, or `None` if it was removed.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::InvalidQuantity` above [`MAX_ITEM_QUANTITY`] and
    /// `ShopError::CartItemNotFound` if the item is not in the user's cart.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<Option<CartItem>, ShopError> {
        if quantity > MAX_ITEM_QUANTITY {
            return Err(ShopError::InvalidQuantity(quantity));
        }

        let cart = self.cart_for(user_id).await?;
        let _guard = self.locks.acquire(cart.id).await;

        if quantity < 1 {
            if !self.carts.delete_item(cart.id, item_id).await? {
                return Err(ShopError::CartItemNotFound(item_id));
            }
            return Ok(None);
        }

        match self.carts.set_item_quantity(cart.id, item_id, quantity).await {
            Ok(item) => Ok(Some(item)),
            Err(RepositoryError::NotFound) => Err(ShopError::CartItemNotFound(item_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove an item from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::CartItemNotFound` if the item is not in the user's cart.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<(), ShopError> {
        let cart = self.cart_for(user_id).await?;
        let _guard = self.locks.acquire(cart.id).await;

        if self.carts.delete_item(cart.id, item_id).await? {
            Ok(())
        } else {
            Err(ShopError::CartItemNotFound(item_id))
        }
    }

    /// Pair every item in the cart with its current product.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::CatalogUnavailable` if the catalog cannot be read.
    pub async fn resolve(&self, cart: &Cart) -> Result<Vec<ResolvedLine>, ShopError> {
        let items = self.carts.list_items(cart.id).await?;
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = self.catalog.get_by_id(item.product_id.as_str()).await?;
            lines.push(ResolvedLine { item, product });
        }
        Ok(lines)
    }

    /// Sum of current price times quantity. Items whose product is gone count as zero.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::CatalogUnavailable` if the catalog cannot be read
    /// and `ShopError::AmountOverflow` if the total does not fit.
    pub async fn total_price(&self, user_id: UserId) -> Result<Decimal, ShopError> {
        let cart = self.cart_for(user_id).await?;
        let lines = self.resolve(&cart).await?;
        sum_lines(&lines)
    }

    /// Number of distinct items (not the sum of quantities).
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if the store fails.
    pub async fn item_count(&self, user_id: UserId) -> Result<i64, ShopError> {
        let cart = self.cart_for(user_id).await?;
        Ok(self.carts.count_items(cart.id).await?)
    }

    /// Build the cart page.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::CatalogUnavailable` if the catalog cannot be read
    /// and `ShopError::AmountOverflow` if the total does not fit.
    pub async fn view(&self, user_id: UserId) -> Result<CartView, ShopError> {
        let cart = self.cart_for(user_id).await?;
        let lines = self.resolve(&cart).await?;

        let total_price = sum_lines(&lines)?;
        let item_count = i64::try_from(lines.len())
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(CartView {
            lines: lines
                .into_iter()
                .map(CartLine::try_from)
                .collect::<Result<_, _>>()?,
            total_price,
            display_total: format_price(total_price),
            item_count,
        })
    }
}

fn sum_lines(lines: &[ResolvedLine]) -> Result<Decimal, ShopError> {
    let totals = lines
        .iter()
        .map(ResolvedLine::line_total)
        .collect::<Result<Vec<_>, _>>()?;
    sum_amounts(totals).ok_or(ShopError::AmountOverflow)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::catalog::tests::product;
    use crate::db::MemoryStore;

    struct Fixture {
        catalog: InMemoryCatalog,
        store: MemoryStore,
        locks: CartLocks,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                catalog: InMemoryCatalog::new(vec![
                    product("a", "Apron", "Kitchen", 1500),
                    product("b", "Bowl", "Kitchen", 800),
                ]),
                store: MemoryStore::new(),
                locks: CartLocks::new(),
            }
        }

        fn service(&self) -> CartService<'_> {
            CartService::new(&self.catalog, &self.store, &self.locks)
        }
    }

    const USER: UserId = UserId::new(1);

    #[tokio::test]
    async fn test_repeated_add_increments_one_line() {
        let fx = Fixture::new();
        let cart = fx.service();

        for expected in 1..=3 {
            let added = cart.add_item(USER, "a").await.unwrap();
            assert_eq!(added.item.quantity, expected);
            assert_eq!(added.cart_item_count, 1);
        }
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let fx = Fixture::new();
        let result = fx.service().add_item(USER, "nope").await;
        assert!(matches!(result, Err(ShopError::ProductNotFound(id)) if id == "nope"));
        assert_eq!(fx.service().item_count(USER).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_with_catalog_down_changes_nothing() {
        let fx = Fixture::new();
        fx.catalog.set_offline(true);
        let result = fx.service().add_item(USER, "a").await;
        assert!(matches!(result, Err(ShopError::CatalogUnavailable(_))));
        assert_eq!(fx.service().item_count(USER).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_quantity_zero_and_negative_delete() {
        let fx = Fixture::new();
        let cart = fx.service();

        for q in [0, -3] {
            let item = cart.add_item(USER, "a").await.unwrap().item;
            assert!(cart.set_quantity(USER, item.id, q).await.unwrap().is_none());
            assert_eq!(cart.item_count(USER).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_set_quantity_sets_exactly() {
        let fx = Fixture::new();
        let cart = fx.service();
        let item = cart.add_item(USER, "a").await.unwrap().item;

        let updated = cart.set_quantity(USER, item.id, 4).await.unwrap().unwrap();
        assert_eq!(updated.quantity, 4);
    }

    #[tokio::test]
    async fn test_other_users_item_is_not_found() {
        let fx = Fixture::new();
        let cart = fx.service();
        let item = cart.add_item(UserId::new(2), "a").await.unwrap().item;

        assert!(matches!(
            cart.set_quantity(USER, item.id, 3).await,
            Err(ShopError::CartItemNotFound(_))
        ));
        assert!(matches!(
            cart.remove_item(USER, item.id).await,
            Err(ShopError::CartItemNotFound(_))
        ));
        assert_eq!(cart.item_count(UserId::new(2)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_total_ignores_vanished_products() {
        let fx = Fixture::new();
        let cart = fx.service();
        cart.add_item(USER, "a").await.unwrap();
        cart.add_item(USER, "a").await.unwrap();
        cart.add_item(USER, "b").await.unwrap();
        assert_eq!(cart.total_price(USER).await.unwrap(), Decimal::new(3800, 2));

        fx.catalog.remove(&ProductId::parse("b").unwrap()).await;
        assert_eq!(cart.total_price(USER).await.unwrap(), Decimal::new(3000, 2));
        assert_eq!(cart.item_count(USER).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_total_errors_when_catalog_down() {
        let fx = Fixture::new();
        let cart = fx.service();
        cart.add_item(USER, "a").await.unwrap();
        fx.catalog.set_offline(true);
        assert!(cart.total_price(USER).await.is_err());
    }

    #[tokio::test]
    async fn test_view_marks_unavailable_lines() {
        let fx = Fixture::new();
        let cart = fx.service();
        cart.add_item(USER, "a").await.unwrap();
        cart.add_item(USER, "b").await.unwrap();
        fx.catalog.remove(&ProductId::parse("a").unwrap()).await;

        let view = cart.view(USER).await.unwrap();
        assert_eq!(view.item_count, 2);
        assert_eq!(view.total_price, Decimal::new(800, 2));

        let gone = view.lines.iter().find(|l| l.product_id.as_str() == "a").unwrap();
        assert!(!gone.available);
        assert!(gone.title.is_none());
        assert_eq!(gone.line_total, Decimal::ZERO);

        let bowl = view.lines.iter().find(|l| l.product_id.as_str() == "b").unwrap();
        assert!(bowl.available);
        assert_eq!(bowl.title.as_deref(), Some("Bowl"));
    }

    #[tokio::test]
    async fn test_view_formats_total() {
        let fx = Fixture::new();
        let cart = fx.service();
        cart.add_item(USER, "a").await.unwrap();
        cart.add_item(USER, "b").await.unwrap();

        let view = cart.view(USER).await.unwrap();
        assert_eq!(view.total_price, Decimal::new(2300, 2));
        assert_eq!(view.display_total, "$23.00");
    }

    #[tokio::test]
    async fn test_set_quantity_above_cap_rejected() {
        let fx = Fixture::new();
        let cart = fx.service();
        let item = cart.add_item(USER, "a").await.unwrap().item;

        for q in [MAX_ITEM_QUANTITY + 1, i32::MAX] {
            assert!(matches!(
                cart.set_quantity(USER, item.id, q).await,
                Err(ShopError::InvalidQuantity(n)) if n == q
            ));
        }
        let capped = cart
            .set_quantity(USER, item.id, MAX_ITEM_QUANTITY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(capped.quantity, MAX_ITEM_QUANTITY);
    }

    #[tokio::test]
    async fn test_huge_prices_error_instead_of_panicking() {
        let fx = Fixture::new();
        let mut pricey = product("gold", "Gold Kettle", "Kitchen", 100);
        pricey.price = Decimal::MAX / Decimal::ONE_HUNDRED;
        fx.catalog.insert(pricey).await;

        let cart = fx.service();
        let item = cart.add_item(USER, "gold").await.unwrap().item;
        cart.set_quantity(USER, item.id, MAX_ITEM_QUANTITY).await.unwrap();

        assert!(matches!(cart.view(USER).await, Err(ShopError::AmountOverflow)));
        assert!(matches!(
            cart.total_price(USER).await,
            Err(ShopError::AmountOverflow)
        ));
    }

    #[tokio::test]
    async fn test_overflowing_sum_of_lines_errors() {
        let fx = Fixture::new();
        for id in ["big1", "big2"] {
            let mut p = product(id, "Big", "Kitchen", 100);
            p.price = Decimal::MAX / Decimal::TWO + Decimal::ONE;
            fx.catalog.insert(p).await;
        }

        let cart = fx.service();
        cart.add_item(USER, "big1").await.unwrap();
        cart.add_item(USER, "big2").await.unwrap();
        assert!(matches!(cart.view(USER).await, Err(ShopError::AmountOverflow)));
    }

    #[tokio::test]
    async fn test_concurrent_adds_do_not_lose_updates() {
        let fx = std::sync::Arc::new(Fixture::new());
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let fx = std::sync::Arc::clone(&fx);
                tokio::spawn(async move { fx.service().add_item(USER, "a").await.map(|_| ()) })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let view = fx.service().view(USER).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines.first().unwrap().quantity, 16);
    }
}
