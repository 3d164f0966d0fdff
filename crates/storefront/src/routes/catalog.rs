//! Catalog route handlers.
//!
//! Browsing works without an account. When the catalog cannot be read, the
//! listing views answer with no products and `catalog_available: false`
//! instead of failing.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::catalog::{
    CatalogError, Product, RELATED_PRODUCTS_LIMIT, categories, related_products,
};
use crate::state::AppState;

/// Home page: every product plus the category list.
#[derive(Debug, Serialize)]
pub struct HomeView {
    pub products: Vec<Product>,
    pub categories: Vec<String>,
    pub catalog_available: bool,
}

/// Product detail page.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub product: Product,
    pub related_products: Vec<Product>,
}

/// Products in one category.
#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub category: String,
    pub products: Vec<Product>,
    pub catalog_available: bool,
}

/// Search results.
#[derive(Debug, Serialize)]
pub struct SearchView {
    pub query: String,
    pub products: Vec<Product>,
    pub catalog_available: bool,
}

/// Query parameters for search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

/// Turn a catalog failure into an empty listing.
fn degrade(result: Result<Vec<Product>, CatalogError>) -> (Vec<Product>, bool) {
    match result {
        Ok(products) => (products, true),
        Err(e) => {
            tracing::warn!(error = %e, "catalog unavailable, serving empty listing");
            (Vec::new(), false)
        }
    }
}

/// List all products with their categories.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Json<HomeView> {
    let (products, catalog_available) = degrade(state.catalog().list_all().await);
    let categories = categories(&products);

    Json(HomeView {
        products,
        categories,
        catalog_available,
    })
}

/// Show one product and up to four others from its category.
#[instrument(skip(state))]
pub async fn product(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let product = match state.catalog().get_by_id(&id).await {
        Ok(Some(product)) => product,
        Ok(None) => return Redirect::to("/?error=product_not_found").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "catalog unavailable for product page");
            return Redirect::to("/?error=catalog_unavailable").into_response();
        }
    };

    let (related, _) = degrade(
        related_products(state.catalog(), &product, RELATED_PRODUCTS_LIMIT).await,
    );

    Json(ProductView {
        product,
        related_products: related,
    })
    .into_response()
}

/// List products in a category.
#[instrument(skip(state))]
pub async fn category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Json<CategoryView> {
    let (products, catalog_available) = degrade(state.catalog().get_by_category(&category).await);

    Json(CategoryView {
        category,
        products,
        catalog_available,
    })
}

/// Case-insensitive substring search over title, description and category.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(SearchQuery { query }): Query<SearchQuery>,
) -> Json<SearchView> {
    let (products, catalog_available) = degrade(state.catalog().search(&query).await);

    Json(SearchView {
        query,
        products,
        catalog_available,
    })
}
