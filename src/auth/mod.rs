//! # Auth Module
//!
//! This module handles all credential and session functionality including:
//! - Session token issuance and verification
//! - Registration, login and account changes
//! - Password-reset tokens
//! - AuthedUser extractor for protected routes

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod password;
pub mod reset;
pub mod routes;
pub mod service;
pub mod tokens;
pub mod validators;

#[cfg(test)]
mod tests;

pub use error::AuthError;
pub use reset::ResetTokenService;
pub use routes::auth_routes;
pub use service::CredentialService;
pub use tokens::TokenAuthority;
