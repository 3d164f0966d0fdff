//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::catalog::CatalogReader;
use crate::config::StorefrontConfig;
use crate::db::{CartStore, OrderStore, PgStore, UserStore};
use crate::services::{AuthService, CartLocks, CartService, CheckoutService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    catalog: Arc<dyn CatalogReader>,
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderStore>,
    users: Arc<dyn UserStore>,
    locks: CartLocks,
}

/// The storefront's persistence backends.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogReader>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// Every relational store backed by the same `PostgreSQL` pool.
    #[must_use]
    pub fn postgres(pool: PgPool, catalog: Arc<dyn CatalogReader>) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            catalog,
            carts: store.clone(),
            orders: store.clone(),
            users: store,
        }
    }

    /// Every relational store backed by one shared in-memory store.
    pub fn shared<S>(store: Arc<S>, catalog: Arc<dyn CatalogReader>) -> Self
    where
        S: CartStore + OrderStore + UserStore + 'static,
    {
        Self {
            catalog,
            carts: store.clone(),
            orders: store.clone(),
            users: store,
        }
    }
}

impl AppState {
    /// Create state for the deployed service.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - Storefront `PostgreSQL` connection pool
    /// * `catalog` - Product catalog reader
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool, catalog: Arc<dyn CatalogReader>) -> Self {
        let stores = Stores::postgres(pool.clone(), catalog);
        Self::build(config, Some(pool), stores)
    }

    /// Create state over arbitrary stores, with no relational pool.
    #[must_use]
    pub fn with_stores(config: StorefrontConfig, stores: Stores) -> Self {
        Self::build(config, None, stores)
    }

    fn build(config: StorefrontConfig, pool: Option<PgPool>, stores: Stores) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog: stores.catalog,
                carts: stores.carts,
                orders: stores.orders,
                users: stores.users,
                locks: CartLocks::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The storefront database pool, if the state is backed by `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogReader {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn cart_service(&self) -> CartService<'_> {
        CartService::new(
            self.inner.catalog.as_ref(),
            self.inner.carts.as_ref(),
            &self.inner.locks,
        )
    }

    #[must_use]
    pub fn checkout_service(&self) -> CheckoutService<'_> {
        CheckoutService::new(
            self.inner.catalog.as_ref(),
            self.inner.carts.as_ref(),
            self.inner.orders.as_ref(),
            &self.inner.locks,
        )
    }

    #[must_use]
    pub fn auth_service(&self) -> AuthService<'_> {
        AuthService::new(self.inner.users.as_ref())
    }
}
