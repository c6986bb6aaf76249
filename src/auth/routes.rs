//! Authentication routes

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /auth/register` - Create an account
/// - `POST /auth/login` - Email and password login
/// - `POST /auth/forgot-password` - Queue a reset email
/// - `GET /auth/receive-password-reset-token/:token` - Session from a reset token
/// - `POST /auth/reset-password` - Set a new password with a reset token
/// - `GET|DELETE /auth/me` - Current user
/// - `PUT /auth/me/password`, `PUT /auth/me/email` - Account changes
/// - `POST /auth/logout` - Logout (client-side token removal)
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/register", post(handlers::register_handler))
        .route("/auth/login", post(handlers::login_handler))
        .route("/auth/forgot-password", post(handlers::forgot_password_handler))
        .route(
            "/auth/receive-password-reset-token/:token",
            get(handlers::receive_reset_token_handler),
        )
        .route("/auth/reset-password", post(handlers::reset_password_handler))
        .route(
            "/auth/me",
            get(handlers::me_handler).delete(handlers::delete_account_handler),
        )
        .route("/auth/me/password", put(handlers::update_password_handler))
        .route("/auth/me/email", put(handlers::update_email_handler))
        .route("/auth/logout", post(handlers::logout_handler))
}
