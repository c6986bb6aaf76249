// src/oauth/google.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::client::{Endpoints, OAuthClient};
use super::provider::{
    non_empty, IdentityProfile, IdentityProvider, OAuthError, ProviderKind, ProviderToken,
};
use crate::common::config::ProviderCredentials;

const ENDPOINTS: Endpoints = Endpoints {
    authorize: "https://accounts.google.com/o/oauth2/v2/auth",
    token: "https://oauth2.googleapis.com/token",
};
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

#[derive(Debug, Deserialize)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl From<GoogleUserInfo> for IdentityProfile {
    fn from(info: GoogleUserInfo) -> Self {
        IdentityProfile {
            provider: ProviderKind::Google.to_string(),
            id: info.id,
            email: non_empty(info.email),
            name: info.name.unwrap_or_default(),
            picture: non_empty(info.picture),
            username: None,
        }
    }
}

pub struct GoogleProvider {
    client: OAuthClient,
}

impl GoogleProvider {
    pub fn new(http: Client, credentials: &ProviderCredentials, redirect_url: String) -> Self {
        Self {
            client: OAuthClient::new(
                http,
                ProviderKind::Google,
                credentials,
                redirect_url,
                &DEFAULT_SCOPES,
                ENDPOINTS,
            ),
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &str {
        ProviderKind::Google.as_str()
    }

    fn auth_url(&self, state: &str) -> String {
        self.client.authorize_url(state, &[])
    }

    async fn exchange(&self, code: &str) -> Result<ProviderToken, OAuthError> {
        self.client.exchange_code(code).await
    }

    async fn user_info(&self, token: &ProviderToken) -> Result<IdentityProfile, OAuthError> {
        let info: GoogleUserInfo = self
            .client
            .get_json(USERINFO_URL, &token.access_token)
            .await
            .map_err(|e| self.client.user_info_failed(e))?;
        Ok(info.into())
    }
}
