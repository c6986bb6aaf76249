//! OAuth routes

use axum::{routing::get, Router};

use super::handlers;

/// # Routes
/// - `GET /auth/oauth/providers` - Configured provider keys
/// - `GET /auth/oauth/:provider` - Authorization URL and state
/// - `GET /auth/oauth/:provider/callback` - Code exchange and login
pub fn oauth_routes() -> Router {
    Router::new()
        .route("/auth/oauth/providers", get(handlers::list_providers_handler))
        .route("/auth/oauth/:provider", get(handlers::start_handler))
        .route(
            "/auth/oauth/:provider/callback",
            get(handlers::callback_handler),
        )
}
