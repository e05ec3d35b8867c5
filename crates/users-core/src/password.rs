//! Keyed password digests
//!
//! Stored passwords are `hex(HMAC-SHA256(password_key, password))`. The key
//! is deployment specific, so a leaked digest table alone does not allow
//! offline guessing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use trellis_auth_core::SecretKey;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Hashes and verifies user passwords with the password key
#[derive(Clone)]
pub struct PasswordHasher {
    keyed: HmacSha256,
}

impl PasswordHasher {
    pub fn new(password_key: &SecretKey) -> Result<Self> {
        let keyed = HmacSha256::new_from_slice(password_key.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid password key: {}", e)))?;
        Ok(Self { keyed })
    }

    /// Lowercase hex digest of `password`
    pub fn hash(&self, password: &str) -> String {
        let mut mac = self.keyed.clone();
        mac.update(password.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison of `presented` against a stored digest
    pub fn verify(&self, presented: &str, stored_digest: &str) -> bool {
        let Ok(expected) = hex::decode(stored_digest) else {
            return false;
        };

        let mut mac = self.keyed.clone();
        mac.update(presented.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHasher(..)")
    }
}
