//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the storefront database (when there is one) and the product
/// catalog are reachable. Returns 503 Service Unavailable otherwise.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if let Some(pool) = state.pool() {
        if let Err(e) = sqlx::query("SELECT 1").fetch_one(pool).await {
            tracing::warn!(error = %e, "storefront database not ready");
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }

    match state.catalog().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "catalog not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
