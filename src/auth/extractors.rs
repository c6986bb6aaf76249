//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::AuthError;
use super::models::User;
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Reads `Authorization: Bearer <token>`, verifies the session token and
/// loads the user it names. Protected handlers take this as a parameter.
#[derive(Debug)]
pub struct AuthedUser {
    pub id: Uuid,
    pub user: User,
}

/// Pulls the token out of an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let header = match parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        {
            Some(h) => h,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized("missing auth".into()));
            }
        };

        let token = match bearer_token(header) {
            Some(t) => t,
            None => {
                warn!("Authentication failed: Authorization header is not a bearer token");
                return Err(ApiError::Unauthorized("invalid auth scheme".into()));
            }
        };

        match app_state.credentials.validate_token(token).await {
            Ok(user) => {
                debug!(
                    user_id = %user.id,
                    email = %safe_email_log(&user.email),
                    "User authentication successful via extractor"
                );
                Ok(AuthedUser { id: user.id, user })
            }
            Err(AuthError::UserNotFound) => {
                warn!("Authentication failed: token names a user that no longer exists");
                Err(ApiError::Unauthorized("user not found".into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
