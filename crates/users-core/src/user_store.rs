//! User storage
//!
//! Users are kept under their id, with a second index from the credential
//! key `"<name>/<digest>"` to the id, so a login is a single lookup and never
//! compares digests in application code.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::types::User;
use crate::{Error, Result};

/// Storage collaborator for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Id of the user whose name and password digest match
    async fn find_id_by_credentials(
        &self,
        name: &str,
        encrypted_password: &str,
    ) -> Result<Option<String>>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Add a new user. Names are unique.
    async fn insert_user(&self, user: User) -> Result<()>;

    /// Store a new password digest and return the updated record.
    /// The credential index moves with the digest in the same step.
    async fn set_password(&self, id: &str, encrypted_password: String) -> Result<User>;

    /// Overwrite the given profile fields and return the updated record.
    /// `None` leaves a field as it is.
    async fn set_profile(
        &self,
        id: &str,
        sex: Option<String>,
        title: Option<String>,
    ) -> Result<User>;
}

pub fn credential_key(name: &str, encrypted_password: &str) -> String {
    format!("{}/{}", name, encrypted_password)
}

/// In-memory user store
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, User>,
    credentials: DashMap<String, String>,
    names: DashMap<String, String>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_id_by_credentials(
        &self,
        name: &str,
        encrypted_password: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .credentials
            .get(&credential_key(name, encrypted_password))
            .map(|entry| entry.value().clone()))
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        match self.names.entry(user.name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(Error::UserAlreadyExists(user.name));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        self.credentials
            .insert(credential_key(&user.name, &user.encrypted_password), user.id.clone());
        debug!("Stored user {}", user.id);
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn set_password(&self, id: &str, encrypted_password: String) -> Result<User> {
        let mut entry = self
            .users
            .get_mut(id)
            .ok_or_else(|| Error::UserNotFound(id.to_string()))?;

        // The user's shard stays locked until the index points at the new digest
        let user = entry.value_mut();
        self.credentials
            .remove(&credential_key(&user.name, &user.encrypted_password));
        self.credentials
            .insert(credential_key(&user.name, &encrypted_password), user.id.clone());
        user.encrypted_password = encrypted_password;

        debug!("Stored new password digest for user {}", id);
        Ok(user.clone())
    }

    async fn set_profile(
        &self,
        id: &str,
        sex: Option<String>,
        title: Option<String>,
    ) -> Result<User> {
        let mut entry = self
            .users
            .get_mut(id)
            .ok_or_else(|| Error::UserNotFound(id.to_string()))?;

        let user = entry.value_mut();
        if sex.is_some() {
            user.sex = sex;
        }
        if title.is_some() {
            user.title = title;
        }

        debug!("Updated profile of user {}", id);
        Ok(user.clone())
    }
}
