//! Roles and role resolution
//!
//! The session issuer never interprets a role: it asks a [`RoleResolver`] for
//! the permission list and copies it into the token. In a split deployment
//! the resolver is [`crate::proxy::HttpRoleResolver`] talking to the roles
//! service; a single process can use [`RoleStore`] directly.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use trellis_auth_core::RoleClaim;

use crate::{Error, Result};

/// A named bundle of permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub internal_name: String,
    #[serde(default)]
    pub ui_name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Role {
    pub fn new(internal_name: &str, ui_name: &str, permissions: &[&str]) -> Self {
        Self {
            internal_name: internal_name.to_string(),
            ui_name: ui_name.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// The part of the role that travels inside a user token
    pub fn to_claim(&self) -> RoleClaim {
        RoleClaim {
            internal_name: self.internal_name.clone(),
            permissions: self.permissions.clone(),
        }
    }
}

/// Supplies the permission set for a role name
#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// `authorization` is the full `Bearer <token>` value of an internal token
    async fn permissions_by_role_name(
        &self,
        authorization: &str,
        internal_name: &str,
    ) -> Result<Role>;
}

/// In-memory role table backing the roles service
#[derive(Debug, Default)]
pub struct RoleStore {
    roles: DashMap<String, Role>,
}

impl RoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the stock roles
    pub fn with_defaults() -> Self {
        let store = Self::new();
        for role in default_roles() {
            store.upsert(role);
        }
        store
    }

    pub fn upsert(&self, role: Role) {
        self.roles.insert(role.internal_name.clone(), role);
    }

    pub fn get(&self, internal_name: &str) -> Option<Role> {
        self.roles.get(internal_name).map(|entry| entry.value().clone())
    }

    /// All roles ordered by internal name
    pub fn all(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.roles.iter().map(|entry| entry.value().clone()).collect();
        roles.sort_by(|a, b| a.internal_name.cmp(&b.internal_name));
        roles
    }
}

#[async_trait]
impl RoleResolver for RoleStore {
    async fn permissions_by_role_name(
        &self,
        _authorization: &str,
        internal_name: &str,
    ) -> Result<Role> {
        self.get(internal_name)
            .ok_or_else(|| Error::RoleNotFound(internal_name.to_string()))
    }
}

pub fn default_roles() -> Vec<Role> {
    let member = ["canReadProfile", "canUpdateProfile", "canReadSystemLogs"];
    vec![
        Role::new("admin", "admin", &member),
        Role::new("regularUser", "user", &member),
        Role::new("guestSinger", "singer", &[]),
    ]
}
