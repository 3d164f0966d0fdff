//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Storefront database and catalog check
//!
//! # Catalog (public)
//! GET  /                              - All products and categories
//! GET  /product/{id}                  - Product detail with related products
//! GET  /category/{name}               - Products in a category
//! GET  /search?query=                 - Product search
//!
//! # Account
//! GET  /login                         - Login page state
//! POST /login                         - Login action
//! GET  /register                      - Register page state
//! POST /register                      - Register action
//! GET  /logout, POST /logout          - Logout action
//!
//! # Cart (requires auth)
//! GET  /cart                          - Cart contents and total
//! POST /add-to-cart/{product_id}      - Add one unit (JSON response)
//! GET  /remove-from-cart/{item_id}    - Remove a line (also POST)
//! POST /update-cart-item/{item_id}    - Set a line's quantity
//! GET  /checkout, POST /checkout      - Place an order
//!
//! # Orders (requires auth)
//! GET  /orders                        - Order history
//! GET  /orders/{id}                   - One order
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod orders;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::middleware::{
    auth_rate_limiter, cart_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::home))
        .route("/product/{id}", get(catalog::product))
        .route("/category/{name}", get(catalog::category))
        .route("/search", get(catalog::search))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout).post(auth::logout))
        .route_layer(auth_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show))
        .route("/add-to-cart/{product_id}", post(cart::add))
        .route(
            "/remove-from-cart/{item_id}",
            get(cart::remove).post(cart::remove),
        )
        .route("/update-cart-item/{item_id}", post(cart::update))
        .route("/checkout", get(cart::checkout).post(cart::checkout))
        .route_layer(cart_rate_limiter())
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(catalog_routes())
        .merge(account_routes())
        .merge(cart_routes())
        .nest("/orders", order_routes())
}

/// Build the storefront application with its request middleware.
///
/// Layers, outermost first: request tracing, request ID, security headers,
/// sessions. Sentry layers and path normalization are added by the binary.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
