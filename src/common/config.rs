// Application configuration loaded from the environment

use anyhow::{anyhow, bail, Context};
use chrono::Duration;
use std::env;
use std::fmt;

use crate::auth::tokens::{SigningAlgorithm, TokenConfig, DEFAULT_ISSUER};

pub const DEFAULT_VK_API_VERSION: &str = "5.199";

/// Client credentials for one identity provider.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ProviderCredentials {
    /// A provider is registered only when both halves are present.
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub google: ProviderCredentials,
    pub github: ProviderCredentials,
    pub vk: ProviderCredentials,
    pub vk_api_version: String,
    /// Callback URL with a `{provider}` placeholder
    pub redirect_template: String,
    pub http_timeout: Duration,
    pub callback_timeout: Duration,
}

impl OAuthConfig {
    pub fn redirect_url(&self, provider: &str) -> String {
        self.redirect_template.replace("{provider}", provider)
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            google: ProviderCredentials::default(),
            github: ProviderCredentials::default(),
            vk: ProviderCredentials::default(),
            vk_api_version: DEFAULT_VK_API_VERSION.to_string(),
            redirect_template: "http://localhost:8080/auth/oauth/{provider}/callback".to_string(),
            http_timeout: Duration::seconds(10),
            callback_timeout: Duration::seconds(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub token: TokenConfig,
    pub reset_token_ttl: Duration,
    /// Zero disables the background sweep
    pub reset_sweep_interval: Duration,
    /// Link template with a `{token}` placeholder
    pub password_reset_url: String,
    pub hash_concurrency: usize,
    pub oauth: OAuthConfig,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match env::var("PORT") {
            Ok(p) => p
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got '{}'", p))?,
            Err(_) => 8080,
        };

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://auth_api.db".to_string());

        let secret = env::var("JWT_SECRET").unwrap_or_default();
        if secret.trim().is_empty() {
            bail!("JWT_SECRET must be set (run `cargo run --bin generate_jwt_secret`)");
        }

        let algorithm = match env::var("JWT_ALGORITHM") {
            Ok(raw) => raw
                .parse::<SigningAlgorithm>()
                .map_err(|e| anyhow!("JWT_ALGORITHM: {}", e))?,
            Err(_) => SigningAlgorithm::default(),
        };

        let token = TokenConfig {
            secret,
            ttl: duration_var("JWT_EXPIRATION", "24h")?,
            algorithm,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
        };

        let hash_concurrency = match env::var("PASSWORD_HASH_CONCURRENCY") {
            Ok(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow!("PASSWORD_HASH_CONCURRENCY must be a positive integer"))?,
            Err(_) => 4,
        };

        let oauth = OAuthConfig {
            google: credentials_from_env("GOOGLE"),
            github: credentials_from_env("GITHUB"),
            vk: credentials_from_env("VK"),
            vk_api_version: env::var("VK_API_VERSION")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VK_API_VERSION.to_string()),
            redirect_template: env::var("OAUTH_REDIRECT_URL").unwrap_or_else(|_| {
                "http://localhost:8080/auth/oauth/{provider}/callback".to_string()
            }),
            http_timeout: duration_var("OAUTH_HTTP_TIMEOUT", "10s")?,
            callback_timeout: duration_var("OAUTH_CALLBACK_TIMEOUT", "30s")?,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            port,
            database_url,
            token,
            reset_token_ttl: duration_var("PASSWORD_RESET_TOKEN_EXPIRATION", "1h")?,
            reset_sweep_interval: duration_var("RESET_TOKEN_SWEEP_INTERVAL", "10m")?,
            password_reset_url: env::var("PASSWORD_RESET_URL").unwrap_or_else(|_| {
                "http://localhost:3000/reset-password/{token}".to_string()
            }),
            hash_concurrency,
            oauth,
            cors_origins,
        })
    }
}

fn credentials_from_env(prefix: &str) -> ProviderCredentials {
    ProviderCredentials {
        client_id: env::var(format!("{}_CLIENT_ID", prefix)).unwrap_or_default(),
        client_secret: env::var(format!("{}_CLIENT_SECRET", prefix)).unwrap_or_default(),
    }
}

fn duration_var(key: &str, default: &str) -> anyhow::Result<Duration> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    parse_duration(&raw).with_context(|| format!("{} is not a valid duration: '{}'", key, raw))
}

/// Parses durations written the way Go's `time.ParseDuration` accepts them:
/// a sequence of integer amounts with `h`, `m`, `s` or `ms` units, e.g. `1h30m`.
pub fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    let input = raw.trim();
    if input.is_empty() {
        bail!("empty duration");
    }
    if input == "0" {
        return Ok(Duration::zero());
    }

    let mut total = Duration::zero();
    let mut rest = input;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| anyhow!("missing unit after '{}'", rest))?;
        if digits_end == 0 {
            bail!("expected a number at '{}'", rest);
        }
        let amount: i64 = rest[..digits_end].parse()?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        let part = match unit {
            "h" => Duration::try_hours(amount),
            "m" => Duration::try_minutes(amount),
            "s" => Duration::try_seconds(amount),
            "ms" => Duration::try_milliseconds(amount),
            other => bail!("unknown unit '{}'", other),
        }
        .ok_or_else(|| anyhow!("{}{} is out of range", amount, unit))?;
        total = total
            .checked_add(&part)
            .ok_or_else(|| anyhow!("duration '{}' is out of range", input))?;
        rest = &rest[unit_end..];
    }
    Ok(total)
}
