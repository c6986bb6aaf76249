// src/oauth/client.rs
//! Authorization-code flow plumbing shared by the provider adapters

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

use super::provider::{OAuthError, ProviderKind, ProviderToken, UpstreamError};
use crate::common::config::ProviderCredentials;

const CLIENT_USER_AGENT: &str = concat!("auth_api/", env!("CARGO_PKG_VERSION"));

/// Builds the shared HTTP client used for every provider call
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(CLIENT_USER_AGENT)
        .build()
}

#[derive(Debug, Clone, Copy)]
pub struct Endpoints {
    pub authorize: &'static str,
    pub token: &'static str,
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    provider: ProviderKind,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: Vec<String>,
    endpoints: Endpoints,
}

impl OAuthClient {
    pub fn new(
        http: Client,
        provider: ProviderKind,
        credentials: &ProviderCredentials,
        redirect_url: String,
        scopes: &[&str],
        endpoints: Endpoints,
    ) -> Self {
        Self {
            http,
            provider,
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            redirect_url,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            endpoints,
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Authorization URL with the standard parameters followed by `extra`.
    pub fn authorize_url(&self, state: &str, extra: &[(&str, &str)]) -> String {
        let scope_param = self.scopes.join(" ");
        let mut url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.endpoints.authorize,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&scope_param),
            urlencoding::encode(state)
        );
        for (key, value) in extra {
            url.push('&');
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// Exchange an authorization code for a provider token
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderToken, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        debug!(provider = %self.provider, "Exchanging authorization code for token");

        let request = self
            .http
            .post(self.endpoints.token)
            .header(ACCEPT, "application/json")
            .form(&params);

        let body: Value = send_json(request)
            .await
            .map_err(|source| self.exchange_failed(source))?;

        // GitHub answers 200 with an error payload
        if let Some(err) = body.get("error") {
            let description = body
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let message = match err.as_str() {
                Some(code) if !description.is_empty() => format!("{}: {}", code, description),
                Some(code) => code.to_string(),
                None => err.to_string(),
            };
            return Err(self.exchange_failed(UpstreamError::Provider(message)));
        }

        serde_json::from_value(body)
            .map_err(|e| self.exchange_failed(UpstreamError::Decode(e.to_string())))
    }

    /// GET a JSON resource with a bearer token
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, UpstreamError> {
        let request = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT);
        send_json(request).await
    }

    pub fn exchange_failed(&self, source: UpstreamError) -> OAuthError {
        error!(provider = %self.provider, error = %source, "Token exchange failed");
        OAuthError::ExchangeFailed {
            provider: self.provider.to_string(),
            source,
        }
    }

    pub fn user_info_failed(&self, source: UpstreamError) -> OAuthError {
        error!(provider = %self.provider, error = %source, "User info request failed");
        OAuthError::UserInfoFailed {
            provider: self.provider.to_string(),
            source,
        }
    }
}

/// Sends the request and decodes a 2xx JSON body.
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, UpstreamError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| UpstreamError::Decode(e.to_string()))
}
