//! Cart and checkout route handlers.
//!
//! All handlers require a signed-in user. Add-to-cart answers with JSON for
//! scripts; the other mutations redirect back to a page with a
//! `?success=` or `?error=` message code.

use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bramble_core::CartItemId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::{CartView, MAX_ITEM_QUANTITY, ShopError};
use crate::state::AppState;

/// Add-to-cart response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddToCartResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_item_count: Option<i64>,
}

impl AddToCartResponse {
    fn failure(status: StatusCode, message: &str) -> Response {
        let body = Self {
            success: false,
            message: message.to_owned(),
            cart_item_count: None,
        };
        (status, Json(body)).into_response()
    }
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityForm {
    pub quantity: Option<String>,
}

impl UpdateQuantityForm {
    /// The requested quantity; a missing or blank field means 1.
    ///
    /// Values above [`MAX_ITEM_QUANTITY`] are rejected.
    fn quantity(&self) -> Result<i32> {
        let quantity = match self.quantity.as_deref().map(str::trim) {
            None | Some("") => return Ok(1),
            Some(raw) => raw
                .parse::<i32>()
                .map_err(|_| AppError::BadRequest(format!("invalid quantity: {raw}")))?,
        };
        if quantity > MAX_ITEM_QUANTITY {
            return Err(AppError::BadRequest(format!(
                "quantity must be at most {MAX_ITEM_QUANTITY}"
            )));
        }
        Ok(quantity)
    }
}

/// Display the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let view = state.cart_service().view(user.id).await?;
    Ok(Json(view))
}

/// Add one unit of a product to the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Response> {
    match state.cart_service().add_item(user.id, &product_id).await {
        Ok(added) => Ok(Json(AddToCartResponse {
            success: true,
            message: format!("{} added to your cart", added.product.title),
            cart_item_count: Some(added.cart_item_count),
        })
        .into_response()),
        Err(ShopError::ProductNotFound(_)) => Ok(AddToCartResponse::failure(
            StatusCode::NOT_FOUND,
            "Product not found",
        )),
        Err(ShopError::CatalogUnavailable(e)) => {
            tracing::warn!(error = %e, "add to cart while catalog unavailable");
            Ok(AddToCartResponse::failure(
                StatusCode::SERVICE_UNAVAILABLE,
                "The product catalog is temporarily unavailable",
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove an item from the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<i32>,
) -> Result<Redirect> {
    match state
        .cart_service()
        .remove_item(user.id, CartItemId::new(item_id))
        .await
    {
        Ok(()) => Ok(Redirect::to("/cart?success=item_removed")),
        Err(ShopError::CartItemNotFound(_)) => Ok(Redirect::to("/cart?error=item_not_found")),
        Err(e) => Err(e.into()),
    }
}

/// Set an item's quantity; anything below 1 removes it.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<i32>,
    Form(form): Form<UpdateQuantityForm>,
) -> Result<Redirect> {
    let quantity = form.quantity()?;

    match state
        .cart_service()
        .set_quantity(user.id, CartItemId::new(item_id), quantity)
        .await
    {
        Ok(Some(_)) => Ok(Redirect::to("/cart")),
        Ok(None) => Ok(Redirect::to("/cart?success=item_removed")),
        Err(ShopError::CartItemNotFound(_)) => Ok(Redirect::to("/cart?error=item_not_found")),
        Err(e) => Err(e.into()),
    }
}

/// Place an order for the cart's contents.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    match state.checkout_service().checkout(user.id).await {
        Ok(receipt) => {
            let mut location = format!("/?success=order_placed&order={}", receipt.order.id);
            if !receipt.omitted.is_empty() {
                location.push_str(&format!("&omitted={}", receipt.omitted.len()));
            }
            Ok(Redirect::to(&location))
        }
        Err(ShopError::EmptyCart) => Ok(Redirect::to("/cart?error=empty_cart")),
        Err(ShopError::CartChanged) => Ok(Redirect::to("/cart?error=cart_changed")),
        Err(ShopError::CatalogUnavailable(e)) => {
            tracing::warn!(error = %e, "checkout while catalog unavailable");
            Ok(Redirect::to("/cart?error=catalog_unavailable"))
        }
        Err(e) => Err(e.into()),
    }
}
