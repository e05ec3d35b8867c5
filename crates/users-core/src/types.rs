//! Core types for users-core

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::roles::Role;

/// Role reference as stored with a user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    pub internal_name: String,
}

/// User account as kept by the user store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub encrypted_password: String,
    pub sex: Option<String>,
    pub title: Option<String>,
    pub role: RoleRef,
}

impl User {
    /// Create a new user ID
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// User as returned to callers, with the role fully resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub sex: Option<String>,
    pub title: Option<String>,
    pub role: Role,
}

impl UserProfile {
    pub fn new(user: &User, role: Role) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            sex: user.sex.clone(),
            title: user.title.clone(),
            role,
        }
    }
}

/// Request to register a new user
#[derive(Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub password: String,
    #[validate(length(min = 1, max = 64))]
    pub role: String,
    #[validate(length(min = 1, max = 32))]
    pub sex: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub title: Option<String>,
}

/// Login credentials
#[derive(Clone, Default, Deserialize, Validate)]
pub struct LoginCredentials {
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub password: String,
}

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub user: Option<LoginCredentials>,
}

/// Mutable profile fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 32))]
    pub sex: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub title: Option<String>,
}

/// Body of `PUT /users/mine/password`
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub new_password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("sex", &self.sex)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChangePasswordRequest(..)")
    }
}
