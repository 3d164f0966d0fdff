//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, ShopError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart, checkout or order operation failed.
    #[error("Shop error: {0}")]
    Shop(#[from] ShopError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shop(err) => match err {
                ShopError::ProductNotFound(_)
                | ShopError::CartItemNotFound(_)
                | ShopError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                ShopError::EmptyCart | ShopError::CartChanged => StatusCode::CONFLICT,
                ShopError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                ShopError::AmountOverflow => StatusCode::UNPROCESSABLE_ENTITY,
                ShopError::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ShopError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::UserNotFound
                | AuthError::InvalidSessionState => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::PasswordMismatch => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Internal details are never exposed.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Shop(err) => match err {
                ShopError::ProductNotFound(_) => "Product not found".to_string(),
                ShopError::CartItemNotFound(_) => "Cart item not found".to_string(),
                ShopError::OrderNotFound(_) => "Order not found".to_string(),
                ShopError::EmptyCart => "Your cart is empty".to_string(),
                ShopError::InvalidQuantity(_) => "Invalid quantity".to_string(),
                ShopError::AmountOverflow => "Cart total is too large".to_string(),
                ShopError::CartChanged => {
                    "Your cart changed during checkout, please try again".to_string()
                }
                ShopError::CatalogUnavailable(_) => {
                    "The product catalog is temporarily unavailable".to_string()
                }
                ShopError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::PasswordMismatch => "Passwords do not match".to_string(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::InvalidSessionState => "Session expired, please try again".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Authentication error".to_string()
                }
            },
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
