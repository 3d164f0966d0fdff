//! Integration tests for Bramble.
//!
//! The storefront runs in-process on an ephemeral port, backed by the
//! in-memory catalog and store, so the suite needs no database.
//!
//! # Test Categories
//!
//! - `checkout_flow` - Cart and checkout behavior through the service layer
//! - `storefront_http` - Routes, sessions and redirects over real HTTP

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, StatusCode, redirect::Policy};
use rust_decimal::Decimal;

use bramble_core::ProductId;
use bramble_storefront::catalog::{InMemoryCatalog, Product};
use bramble_storefront::config::StorefrontConfig;
use bramble_storefront::db::MemoryStore;
use bramble_storefront::middleware::session_layer;
use bramble_storefront::routes;
use bramble_storefront::state::{AppState, Stores};

/// Build a catalog product priced in cents.
///
/// # Panics
///
/// Panics if `id` is not a valid product identifier.
#[must_use]
pub fn product(id: &str, title: &str, category: &str, price_cents: i64) -> Product {
    Product {
        id: ProductId::parse(id).expect("valid product id"),
        title: title.to_string(),
        description: format!("{title} from the {category} range"),
        category: category.to_string(),
        price: Decimal::new(price_cents, 2),
        image: format!("/images/{id}.jpg"),
    }
}

/// A small catalog across two categories.
#[must_use]
pub fn sample_catalog() -> Vec<Product> {
    vec![
        product("tea-sencha", "Sencha", "Tea", 1250),
        product("tea-assam", "Assam Breakfast", "Tea", 975),
        product("tea-oolong", "Tieguanyin Oolong", "Tea", 1500),
        product("ware-teapot", "Cast Iron Teapot", "Teaware", 4800),
        product("ware-kettle", "Gooseneck Kettle", "Teaware", 3900),
    ]
}

/// Configuration pointing at databases that are never contacted.
///
/// # Panics
///
/// Panics if the fixed values stop parsing.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig::from_lookup(|key| {
        let value = match key {
            "STOREFRONT_DATABASE_URL" => "postgres://localhost/bramble_test",
            "CATALOG_DATABASE_URL" => "postgres://localhost/bramble_catalog_test",
            "STOREFRONT_BASE_URL" => "http://localhost:3000",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("test configuration is valid")
}

/// Storefront wired to in-memory backends.
pub struct TestShop {
    pub catalog: Arc<InMemoryCatalog>,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestShop {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new(products));
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::shared(store.clone(), catalog.clone());
        let state = AppState::with_stores(test_config(), stores);

        Self {
            catalog,
            store,
            state,
        }
    }

    #[must_use]
    pub fn with_sample_catalog() -> Self {
        Self::new(sample_catalog())
    }

    /// Serve the storefront on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn serve(&self) -> TestServer {
        let app = routes::app(
            self.state.clone(),
            session_layer(tower_sessions::MemoryStore::default(), false),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener has an address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("test server failed");
        });

        TestServer {
            base_url: format!("http://{addr}"),
        }
    }
}

/// A running storefront.
pub struct TestServer {
    pub base_url: String,
}

impl TestServer {
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A browser-like client: keeps cookies, does not follow redirects.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Register a new account; the returned client is signed in.
    ///
    /// # Panics
    ///
    /// Panics if registration does not redirect home.
    pub async fn signed_in_client(&self, email: &str) -> Client {
        let client = self.client();
        let resp = client
            .post(self.url("/register"))
            .form(&[
                ("email", email),
                ("password", "correct horse battery"),
                ("password_confirm", "correct horse battery"),
            ])
            .send()
            .await
            .expect("register request failed");

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
        client
    }
}

/// The `Location` header of a redirect, or an empty string.
#[must_use]
pub fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
