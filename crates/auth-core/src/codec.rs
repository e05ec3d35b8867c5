//! Signed token encoding
//!
//! Tokens are compact HS256 JWTs: `base64url(header).base64url(claims).base64url(signature)`.
//! Any process holding the signing key can decode them.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::claims::Claims;
use crate::error::TokenError;
use crate::secrets::SecretKey;

/// Current time in Unix seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Encodes and decodes signed tokens with one shared key
pub struct TokenCodec {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    header: Header,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(signing_key: &SecretKey) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `now >= exp` is checked again after decoding; jsonwebtoken alone
        // would still accept a token on its expiry second.
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;

        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(signing_key.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(signing_key.as_bytes())),
            header: Header::new(Algorithm::HS256),
            validation,
        }
    }

    /// Sign any serializable payload
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify the signature and expiry of a token and deserialize its payload.
    ///
    /// The payload must carry a numeric `exp`.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        let data = decode::<Value>(token, &self.decoding_key, &self.validation)
            .map_err(map_jwt_error)?;

        let exp = data
            .claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| TokenError::Malformed("missing numeric exp".to_string()))?;

        if unix_now() >= exp {
            return Err(TokenError::Expired);
        }

        serde_json::from_value(data.claims).map_err(|e| TokenError::Malformed(e.to_string()))
    }

    pub fn encode_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        self.encode(claims)
    }

    pub fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode(token)
    }
}

fn map_jwt_error(error: jsonwebtoken::errors::Error) -> TokenError {
    match error.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(error.to_string()),
    }
}
