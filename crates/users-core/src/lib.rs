//! # Users-Core
//!
//! Login, credential checks and session issuance for Trellis services.
//!
//! This crate provides:
//! - a keyed password digest and a strength rubric for new passwords
//! - user and role stores
//! - the session issuer, which resolves roles and mints user tokens
//! - REST routes for the auth, users and roles services
//! - a typed proxy for calling other services' internal routes
//!
//! ## Architecture
//!
//! Users-Core issues tokens while auth-core verifies them. Both share the
//! signing secret through [`trellis_auth_core::Secrets`].

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod password;
pub mod proxy;
pub mod roles;
pub mod types;
pub mod user_store;
pub mod validation;

use std::sync::Arc;

use tracing::{info, warn};
use trellis_auth_core::{Secrets, SessionVerifier, TokenCodec};

pub use api::{create_router, AppState};
pub use auth::{AuthenticationResult, AuthenticationService};
pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use jwt::{IssuedSession, SessionConfig, SessionIssuer};
pub use password::PasswordHasher;
pub use proxy::{HttpRoleResolver, ServiceProxy};
pub use roles::{Role, RoleResolver, RoleStore};
pub use types::{NewUser, User, UserProfile};
pub use user_store::{InMemoryUserStore, UserStore};
pub use validation::{password_strength, PasswordPolicy, StrengthLevel};

/// Wire the services together from configuration and loaded secrets
pub fn init(config: &ServiceConfig, secrets: &Secrets) -> Result<AppState> {
    let codec = Arc::new(TokenCodec::new(secrets.signing_key()));
    let roles = Arc::new(RoleStore::with_defaults());

    let resolver: Arc<dyn RoleResolver> = match &config.roles.base_url {
        Some(base_url) => {
            info!("Resolving roles through {}", base_url);
            Arc::new(HttpRoleResolver::new(base_url, config.session.role_resolution_timeout())?)
        }
        None => roles.clone() as Arc<dyn RoleResolver>,
    };

    let issuer = Arc::new(SessionIssuer::new(codec.clone(), config.session.clone(), resolver));
    let auth = AuthenticationService::new(
        Arc::new(InMemoryUserStore::new()),
        PasswordHasher::new(secrets.password_key())?,
        PasswordPolicy::new(config.password.min_strength_level),
        issuer,
    );

    Ok(AppState {
        auth: Arc::new(auth),
        roles,
        verifier: SessionVerifier::new(codec),
    })
}

/// Register the configured seed users, skipping any that fail
pub async fn seed_users(state: &AppState, users: &[NewUser]) -> usize {
    let mut registered = 0;
    for user in users {
        match state.auth.register_user(user.clone()).await {
            Ok(_) => registered += 1,
            Err(e) => warn!("Skipping seed user {:?}: {}", user.name, e),
        }
    }
    registered
}
