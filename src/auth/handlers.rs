//! Authentication handlers

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::extractors::AuthedUser;
use super::models::*;
use super::validators::{AccountValidator, LoginValidator, PasswordResetValidator, RegisterValidator};
use crate::common::{safe_email_log, ApiError, AppState, Validator};

fn parse_reset_token(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest("invalid token".to_string()))
}

/// POST /auth/register
///
/// # Request Body
/// ```json
/// { "email": "alice@example.com", "password": "password123", "name": "Alice" }
/// ```
///
/// # Response
/// `201 Created` with `{ "token": "<jwt>", "user": { ... } }`
pub async fn register_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    RegisterValidator.validate(&payload).into_result()?;

    let user = state
        .credentials
        .register(&payload.email, &payload.password, payload.name)
        .await?;
    let (token, user) = state.credentials.login_by_id(user.id).await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// POST /auth/login
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    LoginValidator.validate(&payload).into_result()?;

    let (token, user) = state
        .credentials
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(AuthResponse { token, user }))
}

/// POST /auth/forgot-password
///
/// Queues a reset email. Answers `202 Accepted`; an unknown email is a 404.
pub async fn forgot_password_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    PasswordResetValidator.validate(&payload).into_result()?;

    state
        .reset_tokens
        .request_password_reset(&payload.email, state.notifications.as_ref())
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Password reset email sent" })),
    ))
}

/// GET /auth/receive-password-reset-token/{token}
///
/// Exchanges a live reset token for a session. The reset token stays valid
/// until it is used with `/auth/reset-password` or expires.
pub async fn receive_reset_token_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<AuthResponse>, ApiError> {
    let token_id = parse_reset_token(&token)?;

    let user_id = state
        .reset_tokens
        .resolve_user(token_id, state.config.reset_token_ttl)
        .await?;
    let (token, user) = state.credentials.login_by_id(user_id).await?;

    info!(user_id = %user.id, "Session issued from password reset token");
    Ok(Json(AuthResponse { token, user }))
}

/// POST /auth/reset-password
pub async fn reset_password_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    PasswordResetValidator.validate(&payload).into_result()?;
    let token_id = parse_reset_token(&payload.token)?;

    state
        .reset_tokens
        .complete_reset(token_id, state.config.reset_token_ttl, &payload.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me
pub async fn me_handler(authed: AuthedUser) -> Json<User> {
    Json(authed.user)
}

/// PUT /auth/me/password
pub async fn update_password_handler(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    AccountValidator.validate(&payload).into_result()?;

    state
        .credentials
        .update_password(authed.id, &payload.old_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /auth/me/email
pub async fn update_email_handler(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    Json(payload): Json<UpdateEmailRequest>,
) -> Result<StatusCode, ApiError> {
    AccountValidator.validate(&payload).into_result()?;

    state
        .credentials
        .update_email(authed.id, &payload.email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /auth/me
pub async fn delete_account_handler(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
) -> Result<StatusCode, ApiError> {
    state.credentials.delete_account(authed.id).await?;
    warn!(
        user_id = %authed.id,
        email = %safe_email_log(&authed.user.email),
        "Account deleted by owner"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/logout
/// Session tokens are stateless, so logout is handled client-side.
/// This endpoint just confirms the request.
pub async fn logout_handler(authed: AuthedUser) -> Json<serde_json::Value> {
    info!(user_id = %authed.id, "User logout successful");
    Json(json!({ "message": "Logout successful" }))
}
