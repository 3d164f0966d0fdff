//! Storefront routes over real HTTP.
//!
//! Each test starts its own server, so rate limits and sessions never leak
//! between tests.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::Value;

use bramble_core::ProductId;
use bramble_integration_tests::{TestShop, location};

async fn json(resp: reqwest::Response) -> Value {
    resp.json::<Value>().await.unwrap()
}

#[tokio::test]
async fn test_health_endpoints() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    let client = server.client();

    let resp = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client.get(server.url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    shop.catalog.set_offline(true);
    let resp = client.get(server.url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_home_lists_products_and_categories() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;

    let resp = server.client().get(server.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let body = json(resp).await;
    assert_eq!(body["catalog_available"], true);
    assert_eq!(body["products"].as_array().unwrap().len(), 5);
    assert_eq!(body["categories"], serde_json::json!(["Tea", "Teaware"]));
}

#[tokio::test]
async fn test_browsing_degrades_when_catalog_is_down() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    let client = server.client();
    shop.catalog.set_offline(true);

    let body = json(client.get(server.url("/")).send().await.unwrap()).await;
    assert_eq!(body["catalog_available"], false);
    assert!(body["products"].as_array().unwrap().is_empty());

    let body = json(
        client
            .get(server.url("/search?query=tea"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["catalog_available"], false);

    let resp = client
        .get(server.url("/product/tea-sencha"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/?error=catalog_unavailable");
}

#[tokio::test]
async fn test_product_page_shows_related_products() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    let client = server.client();

    let body = json(
        client
            .get(server.url("/product/tea-sencha"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["product"]["title"], "Sencha");
    assert_eq!(body["product"]["price"], "12.50");

    let related = body["related_products"].as_array().unwrap();
    assert_eq!(related.len(), 2);
    assert!(related.iter().all(|p| p["category"] == "Tea"));
    assert!(related.iter().all(|p| p["id"] != "tea-sencha"));

    let resp = client
        .get(server.url("/product/no-such-thing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/?error=product_not_found");
}

#[tokio::test]
async fn test_category_and_search() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    let client = server.client();

    let body = json(
        client
            .get(server.url("/category/Teaware"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["category"], "Teaware");
    assert_eq!(body["products"].as_array().unwrap().len(), 2);

    let body = json(
        client
            .get(server.url("/category/Nothing"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert!(body["products"].as_array().unwrap().is_empty());
    assert_eq!(body["catalog_available"], true);

    let body = json(
        client
            .get(server.url("/search?query=IRON"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["query"], "IRON");
    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products.first().unwrap()["id"], "ware-teapot");

    let body = json(client.get(server.url("/search")).send().await.unwrap()).await;
    assert_eq!(body["products"].as_array().unwrap().len(), 5);

    // Surrounding spaces are part of the search text.
    let body = json(
        client
            .get(server.url("/search?query=%20iron%20"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["query"], " iron ");
    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products.first().unwrap()["id"], "ware-teapot");

    let body = json(
        client
            .get(server.url("/search?query=%20sencha%20"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["query"], " sencha ");
    assert!(body["products"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_requires_login() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    let client = server.client();

    let resp = client.get(server.url("/cart")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/login"));

    let resp = client
        .post(server.url("/add-to-cart/tea-sencha"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client.get(server.url("/orders")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_registration_errors_redirect_with_codes() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    let client = server.client();

    let cases = [
        (("not-an-email", "long enough pw", "long enough pw"), "invalid_email"),
        (("a@example.com", "long enough pw", "different pw!"), "password_mismatch"),
        (("a@example.com", "short", "short"), "weak_password"),
    ];
    for ((email, password, confirm), code) in cases {
        let resp = client
            .post(server.url("/register"))
            .form(&[
                ("email", email),
                ("password", password),
                ("password_confirm", confirm),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), format!("/register?error={code}"));
    }
}

#[tokio::test]
async fn test_duplicate_email_and_login_round_trip() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    server.signed_in_client("dana@example.com").await;

    let other = server.client();
    let resp = other
        .post(server.url("/register"))
        .form(&[
            ("email", "Dana@Example.com"),
            ("password", "another password"),
            ("password_confirm", "another password"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), "/register?error=email_taken");

    let resp = other
        .post(server.url("/login"))
        .form(&[("email", "dana@example.com"), ("password", "wrong password")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), "/login?error=credentials");

    let resp = other
        .post(server.url("/login"))
        .form(&[
            ("email", "dana@example.com"),
            ("password", "correct horse battery"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), "/");

    let resp = other.get(server.url("/cart")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = other.post(server.url("/logout")).send().await.unwrap();
    assert_eq!(location(&resp), "/?success=logged_out");

    let resp = other.get(server.url("/cart")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_shopping_flow_end_to_end() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    let client = server.signed_in_client("erin@example.com").await;

    let resp = client
        .post(server.url("/add-to-cart/tea-sencha"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["cart_item_count"], 1);

    let body = json(
        client
            .post(server.url("/add-to-cart/tea-sencha"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["cart_item_count"], 1);

    let body = json(
        client
            .post(server.url("/add-to-cart/ware-kettle"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["cart_item_count"], 2);

    let resp = client
        .post(server.url("/add-to-cart/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(resp).await["success"], false);

    let cart = json(client.get(server.url("/cart")).send().await.unwrap()).await;
    assert_eq!(cart["total_price"], "64.00");
    let lines = cart["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 2);

    let kettle_id = lines
        .iter()
        .find(|line| line["product_id"] == "ware-kettle")
        .unwrap()["item_id"]
        .as_i64()
        .unwrap();

    let resp = client
        .post(server.url(&format!("/update-cart-item/{kettle_id}")))
        .form(&[("quantity", "3")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), "/cart");

    let resp = client
        .post(server.url(&format!("/update-cart-item/{kettle_id}")))
        .form(&[("quantity", "lots")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let cart = json(client.get(server.url("/cart")).send().await.unwrap()).await;
    assert_eq!(cart["total_price"], "142.00");

    let resp = client.post(server.url("/checkout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let target = location(&resp);
    assert!(target.starts_with("/?success=order_placed&order="));
    let order_id = target.rsplit('=').next().unwrap().to_string();

    let order = json(
        client
            .get(server.url(&format!("/orders/{order_id}")))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(order["total_price"], "142.00");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);

    let orders = json(client.get(server.url("/orders")).send().await.unwrap()).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let cart = json(client.get(server.url("/cart")).send().await.unwrap()).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());

    let resp = client.get(server.url("/checkout")).send().await.unwrap();
    assert_eq!(location(&resp), "/cart?error=empty_cart");
}

#[tokio::test]
async fn test_remove_and_zero_quantity() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    let client = server.signed_in_client("finn@example.com").await;

    client
        .post(server.url("/add-to-cart/tea-assam"))
        .send()
        .await
        .unwrap();
    client
        .post(server.url("/add-to-cart/tea-oolong"))
        .send()
        .await
        .unwrap();

    let cart = json(client.get(server.url("/cart")).send().await.unwrap()).await;
    let ids: Vec<i64> = cart["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["item_id"].as_i64().unwrap())
        .collect();
    let (first, second) = (ids.first().unwrap(), ids.get(1).unwrap());

    let resp = client
        .get(server.url(&format!("/remove-from-cart/{first}")))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), "/cart?success=item_removed");

    let resp = client
        .get(server.url(&format!("/remove-from-cart/{first}")))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), "/cart?error=item_not_found");

    let resp = client
        .post(server.url(&format!("/update-cart-item/{second}")))
        .form(&[("quantity", "0")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let cart = json(client.get(server.url("/cart")).send().await.unwrap()).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_users_cannot_see_each_others_orders() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    let gail = server.signed_in_client("gail@example.com").await;
    let hugo = server.signed_in_client("hugo@example.com").await;

    gail.post(server.url("/add-to-cart/tea-sencha"))
        .send()
        .await
        .unwrap();
    let resp = gail.post(server.url("/checkout")).send().await.unwrap();
    let order_id = location(&resp).rsplit('=').next().unwrap().to_string();

    let resp = hugo
        .get(server.url(&format!("/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let orders = json(hugo.get(server.url("/orders")).send().await.unwrap()).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_reports_omitted_products() {
    let shop = TestShop::with_sample_catalog();
    let server = shop.serve().await;
    let client = server.signed_in_client("ivy@example.com").await;

    client
        .post(server.url("/add-to-cart/tea-sencha"))
        .send()
        .await
        .unwrap();
    client
        .post(server.url("/add-to-cart/ware-teapot"))
        .send()
        .await
        .unwrap();
    shop.catalog
        .remove(&ProductId::parse("ware-teapot").unwrap())
        .await;

    let resp = client.post(server.url("/checkout")).send().await.unwrap();
    let target = location(&resp);
    assert!(target.starts_with("/?success=order_placed&order="));
    assert!(target.ends_with("&omitted=1"));
}
