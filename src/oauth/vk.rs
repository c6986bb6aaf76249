// src/oauth/vk.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::client::{send_json, Endpoints, OAuthClient};
use super::provider::{
    non_empty, IdentityProfile, IdentityProvider, OAuthError, ProviderKind, ProviderToken,
    UpstreamError,
};
use crate::common::config::{ProviderCredentials, DEFAULT_VK_API_VERSION};

const ENDPOINTS: Endpoints = Endpoints {
    authorize: "https://oauth.vk.com/authorize",
    token: "https://oauth.vk.com/access_token",
};
const USERS_GET_URL: &str = "https://api.vk.com/method/users.get";
const DEFAULT_SCOPES: [&str; 1] = ["email"];

#[derive(Debug, Deserialize)]
pub struct VkUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub photo_200: Option<String>,
}

/// Normalizes a `users.get` body. VK reports failures as a 200 with an
/// `error` object, so that is checked before the payload.
pub fn build_profile(token: &ProviderToken, body: Value) -> Result<IdentityProfile, UpstreamError> {
    if let Some(err) = body.get("error") {
        let message = err
            .get("error_msg")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(UpstreamError::Provider(message));
    }

    #[derive(Deserialize)]
    struct UsersGet {
        response: Vec<VkUser>,
    }

    let parsed: UsersGet =
        serde_json::from_value(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
    let user = parsed
        .response
        .into_iter()
        .next()
        .ok_or_else(|| UpstreamError::Decode("no user data in response".to_string()))?;

    let id = user.id.to_string();
    let name = format!("{} {}", user.first_name, user.last_name)
        .trim()
        .to_string();

    Ok(IdentityProfile {
        provider: ProviderKind::Vk.to_string(),
        email: non_empty(token.extra_str("email").map(str::to_string)),
        name,
        picture: non_empty(user.photo_200),
        username: Some(id.clone()),
        id,
    })
}

pub struct VkProvider {
    client: OAuthClient,
    api_version: String,
}

impl VkProvider {
    pub fn new(
        http: Client,
        credentials: &ProviderCredentials,
        redirect_url: String,
        api_version: &str,
    ) -> Self {
        let api_version = if api_version.trim().is_empty() {
            DEFAULT_VK_API_VERSION.to_string()
        } else {
            api_version.to_string()
        };

        Self {
            client: OAuthClient::new(
                http,
                ProviderKind::Vk,
                credentials,
                redirect_url,
                &DEFAULT_SCOPES,
                ENDPOINTS,
            ),
            api_version,
        }
    }
}

#[async_trait]
impl IdentityProvider for VkProvider {
    fn name(&self) -> &str {
        ProviderKind::Vk.as_str()
    }

    fn auth_url(&self, state: &str) -> String {
        self.client
            .authorize_url(state, &[("display", "page"), ("v", self.api_version.as_str())])
    }

    async fn exchange(&self, code: &str) -> Result<ProviderToken, OAuthError> {
        self.client.exchange_code(code).await
    }

    async fn user_info(&self, token: &ProviderToken) -> Result<IdentityProfile, OAuthError> {
        let mut query = vec![
            ("fields", "photo_200,first_name,last_name".to_string()),
            ("access_token", token.access_token.clone()),
            ("v", self.api_version.clone()),
        ];
        if let Some(user_id) = token.extra_i64("user_id") {
            query.push(("user_ids", user_id.to_string()));
        }

        let request = self.client.http().get(USERS_GET_URL).query(&query);
        let body: Value = send_json(request)
            .await
            .map_err(|e| self.client.user_info_failed(e))?;

        build_profile(token, body).map_err(|e| self.client.user_info_failed(e))
    }
}
