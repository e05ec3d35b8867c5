//! Calls to the internal routes of sibling services
//!
//! Every request made from here is authorized with a freshly minted internal
//! token. This is the only code path, besides the session issuer itself,
//! that can obtain such a token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::debug;

use crate::jwt::{InternalTokens, SessionIssuer};
use crate::roles::{Role, RoleResolver};
use crate::types::UserProfile;
use crate::{Error, Result};

const REQUEST_ID_HEADER: &str = "x-request-id";
const ROLES_PATH: &str = "/api/v1/roles/internal";
const ROLE_BY_NAME_PATH: &str = "/api/v1/roles/internal/by-internal-name";
const USER_BY_ID_PATH: &str = "/api/v1/users/internal/by-id";

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("Unable to build HTTP client: {}", e)))
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Role resolver backed by the roles service
#[derive(Debug, Clone)]
pub struct HttpRoleResolver {
    client: Client,
    base_url: String,
}

impl HttpRoleResolver {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: normalize_base_url(base_url),
        })
    }
}

#[async_trait]
impl RoleResolver for HttpRoleResolver {
    async fn permissions_by_role_name(
        &self,
        authorization: &str,
        internal_name: &str,
    ) -> Result<Role> {
        debug!("Resolving role \"{}\" from {}", internal_name, self.base_url);
        let response = self
            .client
            .get(format!("{}{}", self.base_url, ROLE_BY_NAME_PATH))
            .header(AUTHORIZATION, authorization)
            .query(&[("internalName", internal_name)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::RoleNotFound(internal_name.to_string()));
        }

        Ok(response.error_for_status()?.json::<Role>().await?)
    }
}

/// Typed client for the internal routes of the users and roles services
#[derive(Clone)]
pub struct ServiceProxy {
    client: Client,
    base_url: String,
    internal: InternalTokens,
    request_id: Option<String>,
}

impl ServiceProxy {
    pub fn new(base_url: &str, timeout: Duration, issuer: &SessionIssuer) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: normalize_base_url(base_url),
            internal: issuer.internal_tokens().clone(),
            request_id: None,
        })
    }

    /// Same proxy, forwarding `request_id` as `x-request-id`
    pub fn with_request_id(&self, request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..self.clone()
        }
    }

    fn get(&self, path: &str) -> Result<RequestBuilder> {
        let mut request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, self.internal.authorization_header()?);
        if let Some(request_id) = &self.request_id {
            request = request.header(REQUEST_ID_HEADER, request_id);
        }
        Ok(request)
    }

    pub async fn all_roles(&self) -> Result<Vec<Role>> {
        let response = self.get(ROLES_PATH)?.send().await?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn role_by_internal_name(&self, internal_name: &str) -> Result<Role> {
        let response = self
            .get(ROLE_BY_NAME_PATH)?
            .query(&[("internalName", internal_name)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::RoleNotFound(internal_name.to_string()));
        }
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn user_by_id(&self, user_id: &str) -> Result<UserProfile> {
        let response = self
            .get(USER_BY_ID_PATH)?
            .query(&[("userId", user_id)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        Ok(response.error_for_status()?.json().await?)
    }
}

impl std::fmt::Debug for ServiceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("base_url", &self.base_url)
            .field("request_id", &self.request_id)
            .finish()
    }
}
