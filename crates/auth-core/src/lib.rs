//! # Auth-Core - Session tokens for Trellis services
//!
//! Every Trellis service links this crate to validate the bearer tokens it
//! receives. Tokens are HS256-signed JWTs, so any instance holding the shared
//! signing key can verify them without contacting a session store.
//!
//! - [`secrets`] loads the signing and password keys at startup
//! - [`codec`] encodes and decodes signed tokens
//! - [`claims`] is the token payload, either a user session or an internal call
//! - [`session`] turns an `Authorization` header into a [`SessionContext`]
//! - [`middleware`] exposes the verifier as axum gates
//!
//! Issuing user tokens is the job of `trellis-users-core`.

pub mod error;
pub mod secrets;
pub mod claims;
pub mod codec;
pub mod session;
pub mod middleware;

pub use error::{AuthError, SecretError, TokenError, Result};
pub use secrets::{SecretKey, Secrets, SecretsConfig};
pub use claims::{Claims, InternalClaims, RoleClaim, SessionUser, UserClaims};
pub use codec::{unix_now, TokenCodec};
pub use session::{
    bearer_header_value, extract_bearer_token, require_internal, RouteAccess, SessionContext,
    SessionVerifier,
};
pub use middleware::{require_internal_session, require_session, ErrorBody};
