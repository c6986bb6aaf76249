//! # OAuth Module
//!
//! Third-party login through Google, GitHub and VK:
//! - `IdentityProvider` contract with one adapter per provider
//! - Registry keyed by provider name
//! - Redirect and callback routes that end in a local session token

pub mod client;
pub mod github;
pub mod google;
pub mod handlers;
pub mod provider;
pub mod registry;
pub mod routes;
pub mod vk;


pub use provider::{IdentityProfile, OAuthError};
pub use registry::IdentityProviderRegistry;
pub use routes::oauth_routes;
