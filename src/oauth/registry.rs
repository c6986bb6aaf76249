//! Lookup of configured identity providers by key
//!
//! The map is filled once at startup and never mutated afterwards, so the
//! registry is shared behind a plain `Arc` with no lock.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::client::build_http_client;
use super::github::GithubProvider;
use super::google::GoogleProvider;
use super::provider::{IdentityProfile, IdentityProvider, OAuthError, ProviderKind, ProviderToken};
use super::vk::VkProvider;
use crate::common::config::OAuthConfig;

const STATE_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthRedirect {
    pub url: String,
    pub state: String,
}

#[derive(Default, Clone)]
pub struct IdentityProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn IdentityProvider>>,
}

impl IdentityProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every provider whose client ID and secret are both set.
    pub fn from_config(config: &OAuthConfig) -> Result<Self, reqwest::Error> {
        let timeout = config
            .http_timeout
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(10));
        let http = build_http_client(timeout)?;
        let mut registry = Self::new();

        if config.google.is_configured() {
            registry.register(
                ProviderKind::Google,
                Arc::new(GoogleProvider::new(
                    http.clone(),
                    &config.google,
                    config.redirect_url(ProviderKind::Google.as_str()),
                )),
            );
        }

        if config.github.is_configured() {
            registry.register(
                ProviderKind::GitHub,
                Arc::new(GithubProvider::new(
                    http.clone(),
                    &config.github,
                    config.redirect_url(ProviderKind::GitHub.as_str()),
                )),
            );
        }

        if config.vk.is_configured() {
            registry.register(
                ProviderKind::Vk,
                Arc::new(VkProvider::new(
                    http,
                    &config.vk,
                    config.redirect_url(ProviderKind::Vk.as_str()),
                    &config.vk_api_version,
                )),
            );
        }

        info!(providers = ?registry.supported_providers(), "OAuth providers registered");
        Ok(registry)
    }

    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn IdentityProvider>) {
        self.providers.insert(kind, provider);
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn IdentityProvider>, OAuthError> {
        let kind: ProviderKind = name.parse()?;
        self.providers
            .get(&kind)
            .ok_or_else(|| OAuthError::ProviderNotFound(name.to_string()))
    }

    /// Builds the redirect URL. A missing or empty `state` is replaced by a
    /// random one, which is returned so the caller can correlate the callback.
    pub fn auth_url(&self, provider: &str, state: Option<&str>) -> Result<AuthRedirect, OAuthError> {
        let p = self.get(provider)?;
        let state = match state.filter(|s| !s.is_empty()) {
            Some(s) => s.to_string(),
            None => generate_state()?,
        };

        debug!(provider = %provider, "Generated OAuth authorization URL");
        Ok(AuthRedirect {
            url: p.auth_url(&state),
            state,
        })
    }

    pub async fn exchange(&self, provider: &str, code: &str) -> Result<ProviderToken, OAuthError> {
        self.get(provider)?.exchange(code).await
    }

    pub async fn user_info(
        &self,
        provider: &str,
        token: &ProviderToken,
    ) -> Result<IdentityProfile, OAuthError> {
        self.get(provider)?.user_info(token).await
    }

    /// Registered provider keys, sorted.
    pub fn supported_providers(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.providers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// 32 random bytes, URL-safe base64 without padding
pub fn generate_state() -> Result<String, OAuthError> {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| OAuthError::StateGeneration(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
