//! Token payloads
//!
//! On the wire a session token carries either a `user` object or the
//! `isInternalRequest` flag, plus `exp`:
//!
//! ```json
//! {
//!   "user": {
//!     "id": "...",
//!     "name": "Ivan",
//!     "role": {"internalName": "admin", "permissions": ["canReadProfile"]},
//!     "sex": "male",
//!     "title": "Mr."
//!   },
//!   "exp": 1700000000
//! }
//! {"isInternalRequest": true, "exp": 1700000000}
//! ```
//!
//! In code the two shapes are separate variants of [`Claims`], so a handler
//! can never mistake a user session for an internal call.

use serde::{Deserialize, Serialize};

/// Role as embedded in a user token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleClaim {
    pub internal_name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RoleClaim {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Identity of the logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub role: RoleClaim,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClaims {
    pub user: SessionUser,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalClaims {
    pub exp: i64,
}

/// Verified or to-be-signed token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClaims", into = "RawClaims")]
pub enum Claims {
    User(UserClaims),
    Internal(InternalClaims),
}

impl Claims {
    pub fn for_user(user: SessionUser, exp: i64) -> Self {
        Claims::User(UserClaims { user, exp })
    }

    pub fn internal(exp: i64) -> Self {
        Claims::Internal(InternalClaims { exp })
    }

    /// Expiry in Unix seconds
    pub fn exp(&self) -> i64 {
        match self {
            Claims::User(c) => c.exp,
            Claims::Internal(c) => c.exp,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Claims::Internal(_))
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            Claims::User(c) => Some(&c.user),
            Claims::Internal(_) => None,
        }
    }
}

/// Wire representation shared by both variants
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<SessionUser>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_internal_request: bool,
    exp: i64,
}

impl TryFrom<RawClaims> for Claims {
    type Error = String;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        match (raw.user, raw.is_internal_request) {
            (Some(user), false) => Ok(Claims::for_user(user, raw.exp)),
            (None, true) => Ok(Claims::internal(raw.exp)),
            (Some(_), true) => Err("token carries both a user and the internal flag".to_string()),
            (None, false) => Err("token carries neither a user nor the internal flag".to_string()),
        }
    }
}

impl From<Claims> for RawClaims {
    fn from(claims: Claims) -> Self {
        match claims {
            Claims::User(c) => RawClaims {
                user: Some(c.user),
                is_internal_request: false,
                exp: c.exp,
            },
            Claims::Internal(c) => RawClaims {
                user: None,
                is_internal_request: true,
                exp: c.exp,
            },
        }
    }
}
