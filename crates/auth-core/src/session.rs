//! Session verification
//!
//! The verifier turns the raw `Authorization` header of a request into a
//! [`SessionContext`]. Every failure is reported as
//! [`AuthError::Unauthenticated`]; the precise codec reason is only logged,
//! so callers cannot tell a bad signature from an expired token.

use std::sync::Arc;

use axum::http::HeaderValue;
use serde::Serialize;
use tracing::debug;

use crate::claims::{Claims, SessionUser};
use crate::codec::TokenCodec;
use crate::error::{AuthError, Result};

const BEARER_SCHEME: &str = "Bearer";

/// How a route is gated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// No token needed; the verifier is not consulted
    Public,
    /// Any valid session
    Authenticated,
    /// Only internal service-to-service tokens
    InternalOnly,
}

/// Verified claims for the request being handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SessionContext {
    claims: Claims,
}

impl SessionContext {
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.claims.user()
    }

    pub fn is_internal(&self) -> bool {
        self.claims.is_internal()
    }

    pub fn expires_at(&self) -> i64 {
        self.claims.exp()
    }
}

/// Validates inbound bearer tokens
#[derive(Clone)]
pub struct SessionVerifier {
    codec: Arc<TokenCodec>,
}

impl SessionVerifier {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Verify the value of an `Authorization` header
    pub fn verify(&self, authorization: Option<&str>) -> Result<SessionContext> {
        let header = authorization.ok_or_else(|| {
            debug!("Rejecting request without Authorization header");
            AuthError::Unauthenticated
        })?;

        let token = extract_bearer_token(header).ok_or_else(|| {
            debug!("Rejecting Authorization header without Bearer token");
            AuthError::Unauthenticated
        })?;

        let claims = self.codec.decode_claims(token).map_err(|e| {
            debug!("Rejecting session token: {}", e);
            AuthError::Unauthenticated
        })?;

        Ok(SessionContext { claims })
    }

    /// Verify according to the route's access level.
    ///
    /// Public routes yield `None` without looking at the header.
    pub fn verify_for(
        &self,
        access: RouteAccess,
        authorization: Option<&str>,
    ) -> Result<Option<SessionContext>> {
        match access {
            RouteAccess::Public => Ok(None),
            RouteAccess::Authenticated => self.verify(authorization).map(Some),
            RouteAccess::InternalOnly => {
                let session = self.verify(authorization)?;
                require_internal(&session)?;
                Ok(Some(session))
            }
        }
    }
}

/// Reject sessions that are not internal service calls
pub fn require_internal(session: &SessionContext) -> Result<()> {
    if session.is_internal() {
        Ok(())
    } else {
        tracing::warn!(
            "Attempt to access internal route with session of user {:?}",
            session.user().map(|u| u.id.as_str())
        );
        Err(AuthError::InternalUseOnly)
    }
}

/// Token part of a `Bearer <token>` header value. The scheme is matched
/// case-insensitively.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// `Bearer <token>` header value for a freshly issued token
pub fn bearer_header_value(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{} {}", BEARER_SCHEME, token)).ok()
}
