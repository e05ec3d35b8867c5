//! Error types for users-core

use thiserror::Error;
use trellis_auth_core::{AuthError, SecretError, TokenError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid User name and/or password")]
    InvalidCredentials,

    #[error("User with userId \"{0}\" is not found")]
    UserNotFound(String),

    #[error("User name \"{0}\" is already taken")]
    UserAlreadyExists(String),

    #[error("Role by \"internalName\": \"{0}\" was not found")]
    RoleNotFound(String),

    #[error("Password is too weak: level {level}, at least {required} required")]
    WeakPassword { level: u8, required: u8 },

    #[error("Role resolution failed: {0}")]
    RoleResolutionFailed(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Session(#[from] AuthError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
