// src/oauth/github.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::client::{Endpoints, OAuthClient};
use super::provider::{
    non_empty, IdentityProfile, IdentityProvider, OAuthError, ProviderKind, ProviderToken,
};
use crate::common::config::ProviderCredentials;

const ENDPOINTS: Endpoints = Endpoints {
    authorize: "https://github.com/login/oauth/authorize",
    token: "https://github.com/login/oauth/access_token",
};
const USER_URL: &str = "https://api.github.com/user";
const EMAILS_URL: &str = "https://api.github.com/user/emails";
const DEFAULT_SCOPES: [&str; 1] = ["user:email"];

#[derive(Debug, Deserialize)]
pub struct GithubUser {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// First address that is both primary and verified, otherwise the first one listed.
pub fn select_email(emails: &[GithubEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.first())
        .map(|e| e.email.clone())
}

pub fn build_profile(
    user: GithubUser,
    emails: &[GithubEmail],
) -> Result<IdentityProfile, OAuthError> {
    let email = select_email(emails).ok_or_else(|| OAuthError::NoEmailAvailable {
        provider: ProviderKind::GitHub.to_string(),
    })?;

    let name = non_empty(user.name).unwrap_or_else(|| user.login.clone());
    Ok(IdentityProfile {
        provider: ProviderKind::GitHub.to_string(),
        id: user.id.to_string(),
        email: Some(email),
        name,
        picture: non_empty(user.avatar_url),
        username: Some(user.login),
    })
}

pub struct GithubProvider {
    client: OAuthClient,
}

impl GithubProvider {
    pub fn new(http: Client, credentials: &ProviderCredentials, redirect_url: String) -> Self {
        Self {
            client: OAuthClient::new(
                http,
                ProviderKind::GitHub,
                credentials,
                redirect_url,
                &DEFAULT_SCOPES,
                ENDPOINTS,
            ),
        }
    }
}

#[async_trait]
impl IdentityProvider for GithubProvider {
    fn name(&self) -> &str {
        ProviderKind::GitHub.as_str()
    }

    fn auth_url(&self, state: &str) -> String {
        self.client.authorize_url(state, &[("access_type", "offline")])
    }

    async fn exchange(&self, code: &str) -> Result<ProviderToken, OAuthError> {
        self.client.exchange_code(code).await
    }

    async fn user_info(&self, token: &ProviderToken) -> Result<IdentityProfile, OAuthError> {
        let (user, emails) = tokio::try_join!(
            self.client.get_json::<GithubUser>(USER_URL, &token.access_token),
            self.client
                .get_json::<Vec<GithubEmail>>(EMAILS_URL, &token.access_token),
        )
        .map_err(|e| self.client.user_info_failed(e))?;

        build_profile(user, &emails)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emails(value: serde_json::Value) -> Vec<GithubEmail> {
        serde_json::from_value(value).unwrap()
    }

    fn octocat() -> GithubUser {
        serde_json::from_value(json!({
            "id": 583231,
            "login": "octocat",
            "name": "The Octocat",
            "avatar_url": "https://avatars.githubusercontent.com/u/583231?v=4"
        }))
        .unwrap()
    }

    #[test]
    fn test_primary_verified_email_wins() {
        let list = emails(json!([
            { "email": "old@example.com", "primary": false, "verified": true },
            { "email": "primary-unverified@example.com", "primary": true, "verified": false },
            { "email": "octocat@github.com", "primary": true, "verified": true }
        ]));
        assert_eq!(select_email(&list).as_deref(), Some("octocat@github.com"));
    }

    #[test]
    fn test_falls_back_to_first_email() {
        let list = emails(json!([
            { "email": "first@example.com", "primary": false, "verified": false },
            { "email": "second@example.com", "primary": true, "verified": false }
        ]));
        assert_eq!(select_email(&list).as_deref(), Some("first@example.com"));
    }

    #[test]
    fn test_empty_email_list_fails() {
        let result = build_profile(octocat(), &[]);
        assert!(matches!(
            result,
            Err(OAuthError::NoEmailAvailable { provider }) if provider == "github"
        ));
    }

    #[test]
    fn test_profile_normalization() {
        let list = emails(json!([{ "email": "octocat@github.com", "primary": true, "verified": true }]));
        let profile = build_profile(octocat(), &list).unwrap();

        assert_eq!(profile.id, "583231");
        assert_eq!(profile.username.as_deref(), Some("octocat"));
        assert_eq!(profile.name, "The Octocat");
        assert_eq!(profile.email.as_deref(), Some("octocat@github.com"));
    }

    #[test]
    fn test_missing_name_falls_back_to_login() {
        let user: GithubUser =
            serde_json::from_value(json!({ "id": 1, "login": "ghost", "name": null })).unwrap();
        let list = emails(json!([{ "email": "ghost@example.com" }]));
        assert_eq!(build_profile(user, &list).unwrap().name, "ghost");
    }
}
