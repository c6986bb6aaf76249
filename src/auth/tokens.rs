//! Session token issuance and verification
//!
//! Tokens are compact JWS strings signed with an HMAC secret. The library
//! verifies the signature, algorithm and issuer; the validity window
//! (`nbf <= now <= exp`) is checked here against an explicit clock so the
//! result does not depend on when the test or request happens to run.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::models::SessionClaims;

pub const DEFAULT_ISSUER: &str = "auth-service";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is invalid")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("invalid token configuration: {0}")]
    Config(String),
}

/// HMAC variants accepted for session tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    #[default]
    Hs256,
    Hs384,
    Hs512,
}

impl SigningAlgorithm {
    fn as_jwt(self) -> Algorithm {
        match self {
            SigningAlgorithm::Hs256 => Algorithm::HS256,
            SigningAlgorithm::Hs384 => Algorithm::HS384,
            SigningAlgorithm::Hs512 => Algorithm::HS512,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(SigningAlgorithm::Hs256),
            "HS384" => Ok(SigningAlgorithm::Hs384),
            "HS512" => Ok(SigningAlgorithm::Hs512),
            other => Err(TokenError::Config(format!(
                "unsupported signing algorithm '{}', expected HS256, HS384 or HS512",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl: Duration,
    pub algorithm: SigningAlgorithm,
    pub issuer: String,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"***")
            .field("ttl", &self.ttl)
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .finish()
    }
}

pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: SigningAlgorithm,
    ttl: Duration,
    issuer: String,
    validation: Validation,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    pub fn new(config: TokenConfig) -> Result<Self, TokenError> {
        if config.secret.is_empty() {
            return Err(TokenError::Config("secret must not be empty".to_string()));
        }
        if config.ttl <= Duration::zero() {
            return Err(TokenError::Config("ttl must be positive".to_string()));
        }

        let mut validation = Validation::new(config.algorithm.as_jwt());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm: config.algorithm,
            ttl: config.ttl,
            issuer: config.issuer,
            validation,
        })
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, email, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Config("ttl overflows the token expiry".to_string()))?;
        let issued = now.timestamp();
        let claims = SessionClaims {
            sub: user_id,
            email: email.to_string(),
            iat: issued,
            nbf: issued,
            exp: expires.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(
            &Header::new(self.algorithm.as_jwt()),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "Session token rejected");
                TokenError::Invalid
            })?
            .claims;

        let now = now.timestamp();
        if now < claims.nbf {
            debug!(nbf = claims.nbf, now = now, "Session token not yet valid");
            return Err(TokenError::Invalid);
        }
        if now > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
