//! Authentication service
//!
//! Login, credential changes and profile updates. Every successful operation
//! hands back a fresh [`IssuedSession`] for the route layer to put in the
//! `Authorization` response header.

use std::sync::Arc;

use tracing::{debug, info, warn};
use trellis_auth_core::{AuthError, SessionContext};
use validator::Validate;

use crate::jwt::{IssuedSession, SessionIssuer};
use crate::password::PasswordHasher;
use crate::types::{NewUser, RoleRef, UpdateProfileRequest, User, UserProfile};
use crate::user_store::UserStore;
use crate::validation::PasswordPolicy;
use crate::{Error, Result};

/// Result of a login or profile update
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub profile: UserProfile,
    pub session: IssuedSession,
}

pub struct AuthenticationService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
    issuer: Arc<SessionIssuer>,
}

impl AuthenticationService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        policy: PasswordPolicy,
        issuer: Arc<SessionIssuer>,
    ) -> Self {
        Self {
            store,
            hasher,
            policy,
            issuer,
        }
    }

    pub fn issuer(&self) -> &Arc<SessionIssuer> {
        &self.issuer
    }

    /// Register a user. The password must pass the strength policy.
    pub async fn register_user(&self, request: NewUser) -> Result<User> {
        request.validate()?;
        self.policy.check(&request.password)?;

        let user = User {
            id: User::new_id(),
            name: request.name,
            encrypted_password: self.hasher.hash(&request.password),
            sex: request.sex,
            title: request.title,
            role: RoleRef { internal_name: request.role },
        };

        self.store.insert_user(user.clone()).await?;
        info!("Registered user {} with role {}", user.id, user.role.internal_name);
        Ok(user)
    }

    /// Check a name/password pair and open a session
    pub async fn login(&self, name: &str, password: &str) -> Result<AuthenticationResult> {
        let digest = self.hasher.hash(password);

        let Some(user_id) = self.store.find_id_by_credentials(name, &digest).await? else {
            warn!("No authentication record found for user name {:?}", name);
            return Err(Error::InvalidCredentials);
        };

        let Some(user) = self.store.get_user(&user_id).await? else {
            warn!("Credentials point at missing user {}", user_id);
            return Err(Error::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.encrypted_password) {
            warn!("Stored digest mismatch for user {}", user.id);
            return Err(Error::InvalidCredentials);
        }

        let session = self.issuer.issue_for_user(&user).await?;
        info!("User {} logged in", user.id);

        Ok(AuthenticationResult {
            profile: UserProfile::new(&user, session.role.clone()),
            session,
        })
    }

    /// Replace the session user's password and re-issue their token.
    ///
    /// Tokens issued before the change stay valid until they expire.
    pub async fn change_password(
        &self,
        session: &SessionContext,
        new_password: &str,
    ) -> Result<IssuedSession> {
        self.policy.check(new_password)?;

        let user = self.session_user(session).await?;
        // Resolve before writing so a resolver failure leaves the record untouched
        let role = self.issuer.resolve_role(&user.role.internal_name).await?;

        let stored = self
            .store
            .set_password(&user.id, self.hasher.hash(new_password))
            .await?;
        info!("Password changed for user {}", stored.id);

        self.issuer.reissue(&stored, role)
    }

    /// Update sex and/or title and re-issue the token with the new values
    pub async fn update_profile(
        &self,
        session: &SessionContext,
        update: UpdateProfileRequest,
    ) -> Result<AuthenticationResult> {
        update.validate()?;

        let user = self.session_user(session).await?;
        let role = self.issuer.resolve_role(&user.role.internal_name).await?;

        let stored = self.store.set_profile(&user.id, update.sex, update.title).await?;
        debug!("Profile updated for user {}", stored.id);

        let session = self.issuer.reissue(&stored, role)?;
        Ok(AuthenticationResult {
            profile: UserProfile::new(&stored, session.role.clone()),
            session,
        })
    }

    /// Full profile for internal callers
    pub async fn user_by_id(&self, user_id: &str) -> Result<UserProfile> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        let role = self.issuer.resolve_role(&user.role.internal_name).await?;
        Ok(UserProfile::new(&user, role))
    }

    async fn session_user(&self, session: &SessionContext) -> Result<User> {
        let session_user = session.user().ok_or(Error::Session(AuthError::Unauthenticated))?;
        self.store
            .get_user(&session_user.id)
            .await?
            .ok_or_else(|| Error::UserNotFound(session_user.id.clone()))
    }
}
