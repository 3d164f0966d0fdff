//! Seed the product catalog from a YAML file.
//!
//! The file is a list of products. Every entry needs an `id`; the other
//! fields follow the stored document layout:
//!
//! ```yaml
//! - id: tea-001
//!   title: Sencha
//!   description: Steamed Japanese green tea
//!   category: Tea
//!   price: "12.50"
//!   image: /images/sencha.jpg
//! ```
//!
//! Existing products with the same identifier are replaced.

use std::path::Path;

use secrecy::ExposeSecret;
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{error, info};

use bramble_core::ProductId;
use bramble_storefront::catalog::{Product, ProductDocument};

use super::database_url;

/// One product entry in a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub id: String,
    #[serde(flatten)]
    pub doc: ProductDocument,
}

/// Validate every entry, collecting all problems rather than the first.
///
/// # Errors
///
/// Returns one message per invalid entry.
pub fn validate(entries: Vec<SeedProduct>) -> Result<Vec<Product>, Vec<String>> {
    let mut products = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();

    for (index, entry) in entries.into_iter().enumerate() {
        let id = match ProductId::parse(&entry.id) {
            Ok(id) => id,
            Err(e) => {
                errors.push(format!("entry {index}: {e}"));
                continue;
            }
        };
        match entry.doc.into_product(id) {
            Ok(product) => products.push(product),
            Err(e) => errors.push(format!("entry {index}: {e}")),
        }
    }

    let mut seen = std::collections::HashSet::new();
    for product in &products {
        if !seen.insert(product.id.as_str()) {
            errors.push(format!("duplicate product id {}", product.id));
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// Upsert products from a YAML file into the catalog.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML product list
/// * `clear_existing` - If true, delete every product before inserting
///
/// # Errors
///
/// Returns an error if the environment variable is missing, the file cannot be
/// read or fails validation, or database operations fail.
pub async fn catalog(
    file_path: &str,
    clear_existing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = database_url(&["CATALOG_DATABASE_URL"])?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let entries: Vec<SeedProduct> = serde_yaml::from_str(&content)?;

    info!(entries = entries.len(), "Parsed seed file");

    let products = match validate(entries) {
        Ok(products) => products,
        Err(errors) => {
            error!("Seed file validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    let pool = PgPool::connect(url.expose_secret()).await?;
    info!("Connected to catalog database");

    let mut tx = pool.begin().await?;

    if clear_existing {
        let removed = sqlx::query("DELETE FROM products")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        info!(removed, "Cleared existing products");
    }

    for product in &products {
        let doc = ProductDocument {
            title: product.title.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: product.price,
            image: product.image.clone(),
        };

        sqlx::query(
            r"
            INSERT INTO products (id, doc)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc
            ",
        )
        .bind(product.id.as_str())
        .bind(Json(&doc))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!("Seeding complete!");
    info!("  Products upserted: {}", products.len());

    Ok(())
}
