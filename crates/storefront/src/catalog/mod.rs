//! Catalog Reader: read-only access to the product document store.
//!
//! Products are owned by the document store; this crate never writes them.
//! Every lookup goes through [`CatalogReader`], which has two backends:
//!
//! - [`DocumentCatalog`] - the `products` collection in the catalog database
//! - [`InMemoryCatalog`] - a fixed product list, used by tests and scenario suites
//!
//! # Failure semantics
//!
//! Readers return `Err(CatalogError::Unreachable)` when the store cannot be
//! queried. Browse views degrade that to an empty listing; cart and checkout
//! refuse to proceed. A malformed product ID is never an error: it simply
//! resolves to nothing.

mod document;
mod memory;

pub use document::DocumentCatalog;
pub use memory::InMemoryCatalog;

use std::collections::BTreeSet;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bramble_core::ProductId;

/// Maximum number of related products shown on a product page.
pub const RELATED_PRODUCTS_LIMIT: usize = 4;

/// Errors raised by catalog backends.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The document store could not be queried.
    #[error("catalog store unreachable: {0}")]
    Unreachable(String),

    /// A stored document could not be turned into a [`Product`].
    #[error("invalid product document {id}: {reason}")]
    InvalidDocument { id: String, reason: String },
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub image: String,
}

impl Product {
    /// Case-insensitive substring match against title, description and category.
    ///
    /// `needle` must already be lowercased.
    #[must_use]
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        [&self.title, &self.description, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Raw product document as stored in the `products` collection.
///
/// Every field is optional in the store; absent text fields read as empty and
/// an absent price reads as zero. `price` may be a JSON number or a decimal string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
}

impl ProductDocument {
    /// Attach an identifier and validate.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidDocument` if the price is negative.
    pub fn into_product(self, id: ProductId) -> Result<Product, CatalogError> {
        if self.price < Decimal::ZERO {
            return Err(CatalogError::InvalidDocument {
                id: id.to_string(),
                reason: format!("negative price {}", self.price),
            });
        }

        Ok(Product {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            price: self.price,
            image: self.image,
        })
    }
}

/// Read-only accessor over the product catalog.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Every product in the catalog.
    async fn list_all(&self) -> Result<Vec<Product>, CatalogError>;

    /// Look up one product. Malformed identifiers resolve to `None`.
    async fn get_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError>;

    /// Products whose category equals `category` exactly.
    async fn get_by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError>;

    /// Products whose title, description or category contains `text`,
    /// ignoring case. The text is matched literally.
    async fn search(&self, text: &str) -> Result<Vec<Product>, CatalogError>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), CatalogError> {
        Ok(())
    }
}

/// Products sharing `product`'s category, excluding `product` itself.
///
/// # Errors
///
/// Propagates `CatalogError` from the reader.
pub async fn related_products(
    catalog: &dyn CatalogReader,
    product: &Product,
    limit: usize,
) -> Result<Vec<Product>, CatalogError> {
    let related = catalog
        .get_by_category(&product.category)
        .await?
        .into_iter()
        .filter(|candidate| candidate.id != product.id)
        .take(limit)
        .collect();
    Ok(related)
}

/// Distinct, non-empty categories in sorted order.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .filter(|p| !p.category.is_empty())
        .map(|p| p.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
