//! Document-store catalog backend.
//!
//! The catalog database holds a single `products` collection: one row per
//! product, keyed by its opaque identifier, with the product body as JSONB.
//! The schema is owned by the catalog (see `catalog_migrations/`); this
//! module only issues ad-hoc reads against it.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;

use bramble_core::ProductId;

use super::{CatalogError, CatalogReader, Product, ProductDocument};

/// Catalog reader over the `products` document collection.
#[derive(Clone)]
pub struct DocumentCatalog {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    doc: Json<serde_json::Value>,
}

impl DocumentCatalog {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a reader whose pool connects on first use.
    ///
    /// The storefront must start (and serve empty listings) while the
    /// document store is down, so no connection is attempted here.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the connection string cannot be parsed.
    pub fn connect_lazy(url: &SecretString) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_lazy(url.expose_secret())?;
        Ok(Self { pool })
    }

    async fn fetch(
        &self,
        sql: &str,
        arg: Option<&str>,
    ) -> Result<Vec<Product>, CatalogError> {
        let mut query = sqlx::query_as::<_, ProductRow>(sql);
        if let Some(arg) = arg {
            query = query.bind(arg);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(unreachable)?;

        Ok(rows.into_iter().filter_map(decode_or_skip).collect())
    }
}

#[async_trait]
impl CatalogReader for DocumentCatalog {
    async fn list_all(&self) -> Result<Vec<Product>, CatalogError> {
        self.fetch("SELECT id, doc FROM products ORDER BY id", None)
            .await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        let Ok(id) = ProductId::parse(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, ProductRow>("SELECT id, doc FROM products WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unreachable)?;

        Ok(row.and_then(decode_or_skip))
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        self.fetch(
            "SELECT id, doc FROM products WHERE doc->>'category' = $1 ORDER BY id",
            Some(category),
        )
        .await
    }

    async fn search(&self, text: &str) -> Result<Vec<Product>, CatalogError> {
        let pattern = like_pattern(text);
        self.fetch(
            r"
            SELECT id, doc FROM products
            WHERE doc->>'title' ILIKE $1 ESCAPE '\'
               OR doc->>'description' ILIKE $1 ESCAPE '\'
               OR doc->>'category' ILIKE $1 ESCAPE '\'
            ORDER BY id
            ",
            Some(&pattern),
        )
        .await
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unreachable)?;
        Ok(())
    }
}

fn unreachable(err: sqlx::Error) -> CatalogError {
    tracing::warn!(error = %err, "catalog query failed");
    CatalogError::Unreachable(err.to_string())
}

/// Decode a stored row, logging and dropping documents that do not parse.
fn decode_or_skip(row: ProductRow) -> Option<Product> {
    match decode(row) {
        Ok(product) => Some(product),
        Err(e) => {
            tracing::warn!(error = %e, "skipping undecodable product document");
            None
        }
    }
}

fn decode(row: ProductRow) -> Result<Product, CatalogError> {
    let id = ProductId::parse(&row.id).map_err(|e| CatalogError::InvalidDocument {
        id: row.id.clone(),
        reason: e.to_string(),
    })?;
    let doc: ProductDocument =
        serde_json::from_value(row.doc.0).map_err(|e| CatalogError::InvalidDocument {
            id: row.id.clone(),
            reason: e.to_string(),
        })?;
    doc.into_product(id)
}

/// Build an `ILIKE` pattern that matches `text` literally anywhere in a field.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
