//! Session token issuance
//!
//! Three kinds of token leave this module:
//!
//! - internal service tokens (`{isInternalRequest: true, exp}`), short lived,
//!   minted only by [`InternalTokens`] which is private to this crate and used
//!   by the issuer and the service proxy;
//! - user session tokens, minted after a successful login with the role's
//!   permissions resolved and embedded;
//! - re-issued user tokens after a profile or password change, built from
//!   the stored record with a role resolved before the change.
//!
//! Previously issued tokens are not revoked; they stay valid until their own
//! `exp`.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use serde::Deserialize;
use tracing::{debug, info, warn};
use trellis_auth_core::{bearer_header_value, unix_now, Claims, SessionUser, TokenCodec, TokenError};

use crate::roles::{Role, RoleResolver};
use crate::types::User;
use crate::{Error, Result};

/// Longest user session the configuration accepts: 30 days
pub const MAX_TOKEN_LIFETIME_LIMIT_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Token lifetimes and role resolution bounds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_token_lifetime_seconds: u64,
    pub internal_token_lifetime_seconds: u64,
    pub role_resolution_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_token_lifetime_seconds: 3 * 24 * 60 * 60,  // 3 days
            internal_token_lifetime_seconds: 60,
            role_resolution_timeout_ms: 5000,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TOKEN_LIFETIME_LIMIT_SECONDS).contains(&self.max_token_lifetime_seconds) {
            return Err(Error::Config(format!(
                "session.max_token_lifetime_seconds must be between 1 and {}, got {}",
                MAX_TOKEN_LIFETIME_LIMIT_SECONDS, self.max_token_lifetime_seconds
            )));
        }
        if self.internal_token_lifetime_seconds == 0 {
            return Err(Error::Config(
                "session.internal_token_lifetime_seconds must be positive".to_string(),
            ));
        }
        if self.role_resolution_timeout_ms == 0 {
            return Err(Error::Config(
                "session.role_resolution_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn role_resolution_timeout(&self) -> Duration {
        Duration::from_millis(self.role_resolution_timeout_ms)
    }
}

/// Mints internal service-to-service tokens
#[derive(Clone)]
pub(crate) struct InternalTokens {
    codec: Arc<TokenCodec>,
    lifetime_seconds: i64,
}

impl InternalTokens {
    pub(crate) fn new(codec: Arc<TokenCodec>, lifetime_seconds: u64) -> Self {
        Self {
            codec,
            lifetime_seconds: lifetime_seconds as i64,
        }
    }

    pub(crate) fn mint(&self) -> Result<String> {
        let claims = Claims::internal(unix_now() + self.lifetime_seconds);
        Ok(self.codec.encode_claims(&claims)?)
    }

    /// `Bearer <token>` for an outbound internal call
    pub(crate) fn authorization_header(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.mint()?))
    }
}

/// A freshly minted user session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: Claims,
    pub role: Role,
}

impl IssuedSession {
    pub fn expires_at(&self) -> i64 {
        self.claims.exp()
    }

    /// Value for the `Authorization` response header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn header_value(&self) -> Result<HeaderValue> {
        bearer_header_value(&self.token)
            .ok_or_else(|| {
                Error::Token(TokenError::Signing("token is not a valid header value".to_string()))
            })
    }
}

/// Builds user session tokens
pub struct SessionIssuer {
    codec: Arc<TokenCodec>,
    config: SessionConfig,
    internal: InternalTokens,
    resolver: Arc<dyn RoleResolver>,
}

impl SessionIssuer {
    pub fn new(
        codec: Arc<TokenCodec>,
        config: SessionConfig,
        resolver: Arc<dyn RoleResolver>,
    ) -> Self {
        let internal = InternalTokens::new(codec.clone(), config.internal_token_lifetime_seconds);
        Self {
            codec,
            config,
            internal,
            resolver,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn internal_tokens(&self) -> &InternalTokens {
        &self.internal
    }

    /// Ask the role resolver for a role, bounded by the configured timeout.
    ///
    /// Any failure, including a role that comes back under another name,
    /// is [`Error::RoleResolutionFailed`].
    pub async fn resolve_role(&self, internal_name: &str) -> Result<Role> {
        let authorization = self.internal.authorization_header()?;
        let timeout = self.config.role_resolution_timeout();

        let resolved = tokio::time::timeout(
            timeout,
            self.resolver.permissions_by_role_name(&authorization, internal_name),
        )
        .await;

        match resolved {
            Ok(Ok(role)) if role.internal_name == internal_name => Ok(role),
            Ok(Ok(role)) => {
                warn!(
                    "Role resolver answered \"{}\" for \"{}\"",
                    role.internal_name, internal_name
                );
                Err(Error::RoleResolutionFailed(format!(
                    "expected role \"{}\", got \"{}\"",
                    internal_name, role.internal_name
                )))
            }
            Ok(Err(e)) => {
                warn!("Unable to resolve role \"{}\": {}", internal_name, e);
                Err(Error::RoleResolutionFailed(e.to_string()))
            }
            Err(_) => {
                warn!("Resolving role \"{}\" timed out after {:?}", internal_name, timeout);
                Err(Error::RoleResolutionFailed(format!("timed out after {:?}", timeout)))
            }
        }
    }

    /// Session token for a user who just authenticated
    pub async fn issue_for_user(&self, user: &User) -> Result<IssuedSession> {
        let role = self.resolve_role(&user.role.internal_name).await?;
        let session = self.mint_user_token(user, role)?;
        info!("Issued session for user {} until {}", user.id, session.expires_at());
        Ok(session)
    }

    /// Fresh token after the user's profile or password changed.
    ///
    /// `role` comes from [`Self::resolve_role`], called before the change was
    /// stored so a resolver failure leaves the record untouched.
    pub fn reissue(&self, user: &User, role: Role) -> Result<IssuedSession> {
        if role.internal_name != user.role.internal_name {
            return Err(Error::RoleResolutionFailed(format!(
                "expected role \"{}\", got \"{}\"",
                user.role.internal_name, role.internal_name
            )));
        }
        let session = self.mint_user_token(user, role)?;
        info!("Re-issued session for user {} until {}", user.id, session.expires_at());
        Ok(session)
    }

    fn mint_user_token(&self, user: &User, role: Role) -> Result<IssuedSession> {
        let exp = unix_now() + self.config.max_token_lifetime_seconds as i64;
        let claims = Claims::for_user(
            SessionUser {
                id: user.id.clone(),
                name: user.name.clone(),
                role: role.to_claim(),
                sex: user.sex.clone(),
                title: user.title.clone(),
            },
            exp,
        );

        let token = self.codec.encode_claims(&claims)?;
        debug!("Minted user token for {} with role {}", user.id, role.internal_name);

        Ok(IssuedSession { token, claims, role })
    }
}
