//! Secret loading
//!
//! The signing key and the password-hashing key live in two files inside a
//! protected directory. They are read once when a service starts; a service
//! must not come up with a missing or empty secret.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::SecretError;

/// Where the secrets live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    pub dir: PathBuf,
    pub jwt_file_name: String,
    pub user_password_file_name: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("config/secrets"),
            jwt_file_name: "jwt".to_string(),
            user_password_file_name: "user-password".to_string(),
        }
    }
}

impl SecretsConfig {
    pub fn jwt_path(&self) -> PathBuf {
        self.dir.join(&self.jwt_file_name)
    }

    pub fn user_password_path(&self) -> PathBuf {
        self.dir.join(&self.user_password_file_name)
    }
}

/// Immutable key material. Cloning shares the same allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Arc<[u8]>);

impl SecretKey {
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(bytes.as_ref()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Both process-wide secrets
#[derive(Debug, Clone)]
pub struct Secrets {
    signing_key: SecretKey,
    password_key: SecretKey,
}

impl Secrets {
    /// Read both secrets from disk
    pub fn load(config: &SecretsConfig) -> Result<Self, SecretError> {
        let signing_key = read_secret(&config.jwt_path())?;
        let password_key = read_secret(&config.user_password_path())?;

        Ok(Self { signing_key, password_key })
    }

    /// Build from keys already in memory
    pub fn from_keys(signing_key: SecretKey, password_key: SecretKey) -> Self {
        Self { signing_key, password_key }
    }

    pub fn signing_key(&self) -> &SecretKey {
        &self.signing_key
    }

    pub fn password_key(&self) -> &SecretKey {
        &self.password_key
    }
}

fn read_secret(path: &Path) -> Result<SecretKey, SecretError> {
    let bytes = std::fs::read(path).map_err(|e| SecretError::Unavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if bytes.is_empty() {
        return Err(SecretError::Unavailable {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }

    debug!("Loaded secret from {} ({} bytes)", path.display(), bytes.len());
    Ok(SecretKey::new(bytes))
}
