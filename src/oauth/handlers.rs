//! OAuth redirect and callback handlers

use axum::extract::{Extension, Json, Path, Query};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::registry::AuthRedirect;
use crate::auth::models::OAuthLoginResponse;
use crate::auth::AuthError;
use crate::common::{ApiError, AppState};

const DEFAULT_CALLBACK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/oauth/providers
pub async fn list_providers_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<serde_json::Value> {
    Json(json!({ "providers": state.providers.supported_providers() }))
}

/// GET /auth/oauth/:provider
///
/// Returns the provider authorization URL and the state it carries. The
/// caller keeps the state and compares it on the callback.
pub async fn start_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<StartQuery>,
) -> Result<Json<AuthRedirect>, ApiError> {
    let redirect = state
        .providers
        .auth_url(&provider, query.state.as_deref())
        .map_err(AuthError::from)?;
    Ok(Json(redirect))
}

/// GET /auth/oauth/:provider/callback
///
/// Exchanges the code, resolves the profile and logs the user in, creating
/// a local account on first sight of the email.
pub async fn callback_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<OAuthLoginResponse>, ApiError> {
    if let Some(error) = query.error {
        warn!(provider = %provider, error = %error, "Provider denied authorization");
        return Err(ApiError::BadRequest(format!("authorization denied: {}", error)));
    }

    let code = query
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError("code: Code is required".to_string()))?;

    // fail fast on unknown providers before starting the timer
    state.providers.get(&provider).map_err(AuthError::from)?;

    let limit = state
        .config
        .oauth
        .callback_timeout
        .to_std()
        .unwrap_or(DEFAULT_CALLBACK_TIMEOUT);

    let profile = tokio::time::timeout(limit, async {
        let token = state.providers.exchange(&provider, &code).await?;
        state.providers.user_info(&provider, &token).await
    })
    .await
    .map_err(|_| {
        warn!(provider = %provider, "OAuth callback timed out");
        ApiError::GatewayTimeout(format!("{} did not respond in time", provider))
    })?
    .map_err(AuthError::from)?;

    let (token, user) = state.credentials.login_with_identity(&profile).await?;

    info!(
        user_id = %user.id,
        provider = %provider,
        has_state = query.state.is_some(),
        "OAuth login successful"
    );
    Ok(Json(OAuthLoginResponse {
        token,
        user,
        profile,
    }))
}
