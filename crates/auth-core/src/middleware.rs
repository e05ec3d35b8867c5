//! axum session gates
//!
//! Protected routers add one of the two middleware functions with
//! `axum::middleware::from_fn_with_state(verifier, ...)`. Public routers are
//! simply left without a gate. Handlers receive the verified session through
//! the [`SessionContext`] extractor.

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::session::{require_internal, SessionContext, SessionVerifier};

/// Error payload returned by every Trellis route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_code: String,
    pub error_message: String,
}

impl ErrorBody {
    pub fn new(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            error_message: error_message.into(),
        }
    }
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "Unauthenticated",
            AuthError::InternalUseOnly => "InternalUseOnly",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody::new(self.error_code(), self.to_string());
        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        if self == AuthError::Unauthenticated {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

fn authorization_header(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Require any valid session
pub async fn require_session(
    State(verifier): State<SessionVerifier>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let session = verifier.verify(authorization_header(&request))?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Require an internal service-to-service session
pub async fn require_internal_session(
    State(verifier): State<SessionVerifier>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let session = verifier.verify(authorization_header(&request))?;
    require_internal(&session)?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}
