//! In-memory stores with the same semantics as [`PgStore`](super::PgStore).

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use bramble_core::{CartId, CartItemId, Email, OrderId, OrderStatus, ProductId, UserId};

use super::{CartStore, OrderStore, RepositoryError, UserStore};
use crate::models::{Cart, CartItem, NewOrder, Order, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    passwords: HashMap<UserId, String>,
    carts: BTreeMap<CartId, Cart>,
    items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn cart_for(&self, user_id: UserId) -> Option<&Cart> {
        self.carts.values().find(|c| c.user_id == user_id)
    }

    fn create_cart(&mut self, user_id: UserId) -> Cart {
        let cart = Cart {
            id: CartId::new(self.next_id()),
            user_id,
            created_at: Utc::now(),
        };
        self.carts.insert(cart.id, cart.clone());
        cart
    }
}

/// Store backed by ordered maps behind a single lock.
///
/// Every operation takes the write or read lock for its whole duration, so
/// each one is atomic. [`fail_orders`](Self::fail_orders) makes
/// `place_order` fail, for exercising checkout rollback.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_orders: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_orders(&self, fail: bool) {
        self.fail_orders.store(fail, Ordering::SeqCst);
    }

    /// Total number of orders across all users.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(cart) = tables.cart_for(user_id) {
            return Ok(cart.clone());
        }
        Ok(tables.create_cart(user_id))
    }

    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.tables.read().await.cart_for(user_id).cloned())
    }

    async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn increment_item(
        &self,
        cart_id: CartId,
        product_id: &ProductId,
    ) -> Result<CartItem, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.carts.contains_key(&cart_id) {
            return Err(RepositoryError::NotFound);
        }

        if let Some(item) = tables
            .items
            .values_mut()
            .find(|i| i.cart_id == cart_id && &i.product_id == product_id)
        {
            item.quantity += 1;
            return Ok(item.clone());
        }

        let item = CartItem {
            id: CartItemId::new(tables.next_id()),
            cart_id,
            product_id: product_id.clone(),
            quantity: 1,
        };
        tables.items.insert(item.id, item.clone());
        Ok(item)
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

        let mut tables = self.tables.write().await;
        let item = tables
            .items
            .get_mut(&item_id)
            .filter(|i| i.cart_id == cart_id)
            .ok_or(RepositoryError::NotFound)?;
        item.quantity = quantity;
        Ok(item.clone())
    }

    async fn delete_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .items
            .get(&item_id)
            .is_some_and(|i| i.cart_id == cart_id);
        if owned {
            tables.items.remove(&item_id);
        }
        Ok(owned)
    }

    async fn count_items(&self, cart_id: CartId) -> Result<i64, RepositoryError> {
        let tables = self.tables.read().await;
        let count = tables
            .items
            .values()
            .filter(|i| i.cart_id == cart_id)
            .count();
        i64::try_from(count).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(
        &self,
        cart_id: CartId,
        order: NewOrder,
        consumed: &[CartItem],
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;

        if !tables
            .carts
            .get(&cart_id)
            .is_some_and(|c| c.user_id == order.user_id)
        {
            return Err(RepositoryError::NotFound);
        }

        let current: Vec<(CartItemId, i32)> = tables
            .items
            .values()
            .filter(|i| i.cart_id == cart_id)
            .map(|i| (i.id, i.quantity))
            .collect();
        let mut expected: Vec<(CartItemId, i32)> =
            consumed.iter().map(|i| (i.id, i.quantity)).collect();
        expected.sort_unstable();
        if current != expected {
            return Err(RepositoryError::Conflict(
                "cart changed during checkout".to_owned(),
            ));
        }

        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }

        let order = Order {
            id: OrderId::new(tables.next_id()),
            user_id: order.user_id,
            items: order.items,
            total_price: order.total_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        tables.orders.insert(order.id, order.clone());
        for item in consumed {
            tables.items.remove(&item.id);
        }

        Ok(order)
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        // Ids increase with insertion, so reverse id order is newest first.
        Ok(tables
            .orders
            .values()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .get(&order_id)
            .filter(|o| o.user_id == user_id)
            .cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| &u.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: UserId::new(tables.next_id()),
            email: email.clone(),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        tables.passwords.insert(user.id, password_hash.to_owned());
        tables.create_cart(user.id);

        Ok(user)
    }

    async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| &u.email == email)
            .and_then(|u| {
                tables
                    .passwords
                    .get(&u.id)
                    .map(|hash| (u.clone(), hash.clone()))
            }))
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::OrderItem;

    fn pid(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_cart_is_idempotent() {
        let store = MemoryStore::new();
        let a = store.get_or_create_cart(UserId::new(1)).await.unwrap();
        let b = store.get_or_create_cart(UserId::new(1)).await.unwrap();
        let other = store.get_or_create_cart(UserId::new(2)).await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a.id, other.id);
    }

    #[tokio::test]
    async fn test_increment_creates_then_bumps() {
        let store = MemoryStore::new();
        let cart = store.get_or_create_cart(UserId::new(1)).await.unwrap();

        let first = store.increment_item(cart.id, &pid("a")).await.unwrap();
        let second = store.increment_item(cart.id, &pid("a")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 2);
        assert_eq!(store.count_items(cart.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_increment_unknown_cart() {
        let store = MemoryStore::new();
        let err = store.increment_item(CartId::new(99), &pid("a")).await;
        assert!(matches!(err, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_item_ops_scoped_to_cart() {
        let store = MemoryStore::new();
        let mine = store.get_or_create_cart(UserId::new(1)).await.unwrap();
        let theirs = store.get_or_create_cart(UserId::new(2)).await.unwrap();
        let item = store.increment_item(theirs.id, &pid("a")).await.unwrap();

        assert!(matches!(
            store.set_item_quantity(mine.id, item.id, 5).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(!store.delete_item(mine.id, item.id).await.unwrap());
        assert_eq!(store.count_items(theirs.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_quantity_rejects_below_one() {
        let store = MemoryStore::new();
        let cart = store.get_or_create_cart(UserId::new(1)).await.unwrap();
        let item = store.increment_item(cart.id, &pid("a")).await.unwrap();

        assert!(matches!(
            store.set_item_quantity(cart.id, item.id, 0).await,
            Err(RepositoryError::Conflict(_))
        ));
        let updated = store.set_item_quantity(cart.id, item.id, 7).await.unwrap();
        assert_eq!(updated.quantity, 7);
    }

    fn empty_order(user_id: UserId) -> NewOrder {
        NewOrder {
            user_id,
            items: Vec::<OrderItem>::new(),
            total_price: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn test_find_cart_never_creates() {
        let store = MemoryStore::new();
        assert!(store.find_cart(UserId::new(1)).await.unwrap().is_none());
        assert!(store.find_cart(UserId::new(1)).await.unwrap().is_none());

        let cart = store.get_or_create_cart(UserId::new(1)).await.unwrap();
        assert_eq!(store.find_cart(UserId::new(1)).await.unwrap(), Some(cart));
    }

    #[tokio::test]
    async fn test_place_order_clears_cart() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let cart = store.get_or_create_cart(user).await.unwrap();
        store.increment_item(cart.id, &pid("a")).await.unwrap();
        let items = store.list_items(cart.id).await.unwrap();

        let order = store
            .place_order(cart.id, empty_order(user), &items)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(store.count_items(cart.id).await.unwrap(), 0);
        assert_eq!(
            store.get_order(user, order.id).await.unwrap().unwrap().id,
            order.id
        );
        assert!(store.get_order(UserId::new(2), order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_place_order_rejects_cart_changed_since_listing() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let cart = store.get_or_create_cart(user).await.unwrap();
        store.increment_item(cart.id, &pid("a")).await.unwrap();
        let listed = store.list_items(cart.id).await.unwrap();

        // Another writer adds a line and bumps the listed one.
        store.increment_item(cart.id, &pid("b")).await.unwrap();
        store.increment_item(cart.id, &pid("a")).await.unwrap();

        let result = store.place_order(cart.id, empty_order(user), &listed).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert_eq!(store.order_count().await, 0);

        let items = store.list_items(cart.id).await.unwrap();
        let quantities: Vec<(&str, i32)> = items
            .iter()
            .map(|i| (i.product_id.as_str(), i.quantity))
            .collect();
        assert_eq!(quantities, vec![("a", 2), ("b", 1)]);
    }

    #[tokio::test]
    async fn test_place_order_failure_keeps_cart() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let cart = store.get_or_create_cart(user).await.unwrap();
        store.increment_item(cart.id, &pid("a")).await.unwrap();
        store.fail_orders(true);

        let items = store.list_items(cart.id).await.unwrap();

        let result = store.place_order(cart.id, empty_order(user), &items).await;

        assert!(result.is_err());
        assert_eq!(store.count_items(cart.id).await.unwrap(), 1);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_place_order_rejects_foreign_cart() {
        let store = MemoryStore::new();
        let cart = store.get_or_create_cart(UserId::new(1)).await.unwrap();
        let result = store
            .place_order(cart.id, empty_order(UserId::new(2)), &[])
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let cart = store.get_or_create_cart(user).await.unwrap();
        let first = store
            .place_order(cart.id, empty_order(user), &[])
            .await
            .unwrap();
        let second = store
            .place_order(cart.id, empty_order(user), &[])
            .await
            .unwrap();

        let ids: Vec<OrderId> = store
            .list_orders(user)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_create_user_creates_cart_and_rejects_duplicate() {
        let store = MemoryStore::new();
        let email = Email::parse("shopper@example.com").unwrap();
        let user = store.create_with_password(&email, "hash").await.unwrap();

        let tables = store.tables.read().await;
        assert!(tables.cart_for(user.id).is_some());
        drop(tables);

        assert!(matches!(
            store.create_with_password(&email, "hash").await,
            Err(RepositoryError::Conflict(_))
        ));

        let (found, hash) = store.get_with_password(&email).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "hash");
    }
}
