//! Error types for infra-common

use thiserror::Error;

/// Errors raised while bootstrapping shared infrastructure
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

pub type Result<T> = std::result::Result<T, Error>;
