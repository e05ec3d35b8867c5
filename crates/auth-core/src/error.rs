//! Error types for token and session operations

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a secret at startup. Always fatal.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Unable to read secret from file \"{path}\": {reason}")]
    Unavailable { path: PathBuf, reason: String },
}

/// Codec-level token failures.
///
/// These never reach a caller directly: the session verifier folds all of
/// them into [`AuthError::Unauthenticated`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Rejections produced by the session verifier
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("This route can be used only internally from the system itself")]
    InternalUseOnly,
}

pub type Result<T> = std::result::Result<T, AuthError>;
