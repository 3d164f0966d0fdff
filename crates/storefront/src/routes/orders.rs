//! Order history route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use bramble_core::OrderId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::state::AppState;

/// The signed-in user's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = state.checkout_service().orders_for_user(user.id).await?;
    Ok(Json(orders))
}

/// One of the signed-in user's orders.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<i32>,
) -> Result<Json<Order>> {
    let order = state
        .checkout_service()
        .get_order(user.id, OrderId::new(order_id))
        .await?;
    Ok(Json(order))
}
