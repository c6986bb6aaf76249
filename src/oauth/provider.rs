//! Identity provider contract and the types that flow through it

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::error::ErrorKind;

/// Every provider the service knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Google,
    GitHub,
    Vk,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Google, ProviderKind::GitHub, ProviderKind::Vk];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::GitHub => "github",
            ProviderKind::Vk => "vk",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| OAuthError::ProviderNotFound(s.to_string()))
    }
}

/// Failure talking to a provider endpoint.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned an error: {0}")]
    Provider(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("oauth provider {0} not found")]
    ProviderNotFound(String),

    #[error("failed to exchange code with {provider}: {source}")]
    ExchangeFailed {
        provider: String,
        source: UpstreamError,
    },

    #[error("failed to get user info from {provider}: {source}")]
    UserInfoFailed {
        provider: String,
        source: UpstreamError,
    },

    #[error("{provider} did not return an email address")]
    NoEmailAvailable { provider: String },

    #[error("failed to generate state: {0}")]
    StateGeneration(String),
}

impl OAuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OAuthError::ProviderNotFound(_) => ErrorKind::NotFound,
            OAuthError::ExchangeFailed { .. }
            | OAuthError::UserInfoFailed { .. }
            | OAuthError::NoEmailAvailable { .. } => ErrorKind::UpstreamFailure,
            OAuthError::StateGeneration(_) => ErrorKind::Internal,
        }
    }
}

/// Token endpoint response. Fields beyond the standard ones stay in `extra`;
/// VK, for one, puts `email` and `user_id` there.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProviderToken {
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn extra_i64(&self, key: &str) -> Option<i64> {
        self.extra.get(key).and_then(Value::as_i64)
    }
}

impl fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderToken")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Provider profile normalized to one shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityProfile {
    pub provider: String,
    /// Provider-assigned subject, always a string
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    pub picture: Option<String>,
    pub username: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Authorization URL the user is redirected to.
    fn auth_url(&self, state: &str) -> String;

    /// Authorization-code grant against the token endpoint.
    async fn exchange(&self, code: &str) -> Result<ProviderToken, OAuthError>;

    async fn user_info(&self, token: &ProviderToken) -> Result<IdentityProfile, OAuthError>;
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
