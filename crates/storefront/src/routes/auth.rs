//! Account route handlers.
//!
//! Email/password registration, login and logout. Form posts redirect with a
//! message code in `?error=` or `?success=`.

use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthError;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Message code for a failed registration.
const fn register_error_code(err: &AuthError) -> &'static str {
    match err {
        AuthError::InvalidEmail(_) => "invalid_email",
        AuthError::PasswordMismatch => "password_mismatch",
        AuthError::WeakPassword(_) => "weak_password",
        AuthError::UserAlreadyExists => "email_taken",
        _ => "registration",
    }
}

/// Put the user in the session and tag Sentry with them.
async fn sign_in(session: &Session, user: &User) -> Result<(), tower_sessions::session::Error> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Login page state.
pub async fn login_page(Query(query): Query<MessageQuery>) -> Json<MessageQuery> {
    Json(query)
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match state
        .auth_service()
        .login_with_password(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            return Redirect::to("/login?error=credentials").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "login failed");
            return Redirect::to("/login?error=login").into_response();
        }
    };

    if let Err(e) = sign_in(&session, &user).await {
        tracing::error!("Failed to set session: {}", e);
        return Redirect::to("/login?error=session").into_response();
    }

    tracing::info!(user_id = %user.id, "user logged in");
    Redirect::to("/").into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Registration page state.
pub async fn register_page(Query(query): Query<MessageQuery>) -> Json<MessageQuery> {
    Json(query)
}

/// Handle registration form submission.
///
/// A new account is signed in straight away.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let user = match state
        .auth_service()
        .register_with_password(&form.email, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            let code = register_error_code(&e);
            if matches!(e, AuthError::Repository(_) | AuthError::PasswordHash) {
                tracing::error!(error = %e, "registration failed");
            } else {
                tracing::debug!(error = %e, "registration rejected");
            }
            return Redirect::to(&format!("/register?error={code}")).into_response();
        }
    };

    if let Err(e) = sign_in(&session, &user).await {
        tracing::error!("Failed to set session: {}", e);
        return Redirect::to("/login?error=session").into_response();
    }

    Redirect::to("/").into_response()
}

// =============================================================================
// Logout
// =============================================================================

/// Log out and return to the home page.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    clear_sentry_user();

    Redirect::to("/?success=logged_out").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_error_codes() {
        assert_eq!(
            register_error_code(&AuthError::PasswordMismatch),
            "password_mismatch"
        );
        assert_eq!(
            register_error_code(&AuthError::WeakPassword("short".to_string())),
            "weak_password"
        );
        assert_eq!(
            register_error_code(&AuthError::UserAlreadyExists),
            "email_taken"
        );
        assert_eq!(register_error_code(&AuthError::PasswordHash), "registration");
    }
}
