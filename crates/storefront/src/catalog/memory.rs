//! In-memory catalog backend.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use bramble_core::ProductId;

use super::{CatalogError, CatalogReader, Product};

/// Catalog over a fixed product list.
///
/// Products are kept in identifier order. [`set_offline`](Self::set_offline)
/// makes every read fail as if the document store were down.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<Product>>,
    offline: AtomicBool,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(mut products: Vec<Product>) -> Self {
        products.sort_by(|a, b| a.id.cmp(&b.id));
        products.dedup_by(|a, b| a.id == b.id);
        Self {
            products: RwLock::new(products),
            offline: AtomicBool::new(false),
        }
    }

    /// Add a product, replacing any existing product with the same ID.
    pub async fn insert(&self, product: Product) {
        let mut products = self.products.write().await;
        match products.binary_search_by(|p| p.id.cmp(&product.id)) {
            Ok(idx) => {
                if let Some(slot) = products.get_mut(idx) {
                    *slot = product;
                }
            }
            Err(idx) => products.insert(idx, product),
        }
    }

    /// Remove a product. Returns whether it was present.
    pub async fn remove(&self, id: &ProductId) -> bool {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| &p.id != id);
        products.len() != before
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), CatalogError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CatalogError::Unreachable(
                "in-memory catalog is offline".to_string(),
            ));
        }
        Ok(())
    }

    async fn filtered(&self, pred: impl Fn(&Product) -> bool + Send) -> Result<Vec<Product>, CatalogError> {
        self.check_online()?;
        let products = self.products.read().await;
        Ok(products.iter().filter(|p| pred(p)).cloned().collect())
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn list_all(&self) -> Result<Vec<Product>, CatalogError> {
        self.filtered(|_| true).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        self.check_online()?;
        let Ok(id) = ProductId::parse(id) else {
            return Ok(None);
        };
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        self.filtered(|p| p.category == category).await
    }

    async fn search(&self, text: &str) -> Result<Vec<Product>, CatalogError> {
        let needle = text.to_lowercase();
        self.filtered(|p| p.matches_lowercase(&needle)).await
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        self.check_online()
    }
}
