//! REST API for users-core
//!
//! Three routers, one each for the auth, users and roles services. Each can be
//! served alone or merged with [`create_router`]. All paths live under
//! `/api/v1`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use trellis_auth_core::{
    require_internal_session, require_session, ErrorBody, SessionContext, SessionVerifier,
};
use validator::Validate;

use crate::auth::AuthenticationService;
use crate::jwt::IssuedSession;
use crate::roles::{Role, RoleStore};
use crate::types::{ChangePasswordRequest, LoginRequest, UpdateProfileRequest, UserProfile};
use crate::Error;

const API_PREFIX: &str = "/api/v1";
const INTERNAL_ERROR_MESSAGE: &str =
    "We are unable to proceed with your request. Please excuse us and try again later.";

/// Shared state of every route
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthenticationService>,
    pub roles: Arc<RoleStore>,
    pub verifier: SessionVerifier,
}

/// Route-level error: a users-core error rendered as an [`ErrorBody`]
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError(error)
    }
}

impl ApiError {
    fn input(message: impl Into<String>) -> Response {
        error_response(StatusCode::BAD_REQUEST, "UserInputError", message)
    }
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody::new(code, message))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        let (status, code) = match self.0 {
            Error::Session(auth) => return auth.into_response(),
            Error::InvalidCredentials => (StatusCode::UNAUTHORIZED, "UserInputError"),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "UserInputError"),
            Error::WeakPassword { .. } => (StatusCode::BAD_REQUEST, "WeakPassword"),
            Error::UserNotFound(_) => (StatusCode::NOT_FOUND, "UserNotFound"),
            Error::RoleNotFound(_) => (StatusCode::NOT_FOUND, "RoleByInternalNameNotFound"),
            Error::UserAlreadyExists(_) => (StatusCode::CONFLICT, "UserAlreadyExists"),
            Error::RoleResolutionFailed(_) | Error::Http(_) => {
                warn!("Upstream failure: {}", message);
                (StatusCode::BAD_GATEWAY, "RoleResolutionFailed")
            }
            Error::Config(_) | Error::Secret(_) | Error::Token(_) => {
                error!("Request failed: {}", message);
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    INTERNAL_ERROR_MESSAGE,
                );
            }
        };
        error_response(status, code, message)
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn with_session_header(session: &IssuedSession, body: impl IntoResponse) -> ApiResult<Response> {
    let header = session.header_value()?;
    Ok(([(AUTHORIZATION, header)], body).into_response())
}

fn invalid_query(code: &str, property: &str, value: Option<&str>) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        code,
        format!("Invalid query property \"{}\": \"{}\"", property, value.unwrap_or_default()),
    )
}

/// Non-empty query value, passed through as sent
fn query_value(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ---- auth ----

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let credentials = match body {
        Ok(Json(LoginRequest {
            user: Some(credentials),
        })) if credentials.validate().is_ok() => credentials,
        _ => return ApiError(Error::InvalidCredentials).into_response(),
    };

    let result = match state.auth.login(&credentials.name, &credentials.password).await {
        Ok(result) => result,
        Err(e) => return ApiError(e).into_response(),
    };

    match with_session_header(&result.session, Json(result.profile)) {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .with_state(state)
}

// ---- users ----

#[derive(Debug, Deserialize)]
struct UserIdQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

async fn my_session(session: SessionContext) -> Json<SessionContext> {
    Json(session)
}

async fn update_my_profile(
    State(state): State<AppState>,
    session: SessionContext,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Ok(Json(update)) = body else {
        return Ok(ApiError::input("Invalid profile data"));
    };

    let result = state.auth.update_profile(&session, update).await?;
    with_session_header(&result.session, Json(result.profile))
}

async fn change_my_password(
    State(state): State<AppState>,
    session: SessionContext,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Ok(Json(request)) = body else {
        return Ok(ApiError::input("Invalid password change data"));
    };

    let issued = state.auth.change_password(&session, &request.new_password).await?;
    with_session_header(&issued, StatusCode::NO_CONTENT)
}

async fn user_by_id(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> ApiResult<Response> {
    let Some(user_id) = query_value(&query.user_id) else {
        return Ok(invalid_query("InvalidUserId", "userId", query.user_id.as_deref()));
    };

    let profile: UserProfile = state.auth.user_by_id(user_id).await?;
    Ok(Json(profile).into_response())
}

pub fn users_routes(state: AppState) -> Router {
    let mine = Router::new()
        .route("/users/mine", get(my_session).put(update_my_profile))
        .route("/users/mine/password", put(change_my_password))
        .route_layer(from_fn_with_state(state.verifier.clone(), require_session));

    let internal = Router::new()
        .route("/users/internal/by-id", get(user_by_id))
        .route_layer(from_fn_with_state(state.verifier.clone(), require_internal_session));

    mine.merge(internal).with_state(state)
}

// ---- roles ----

#[derive(Debug, Deserialize)]
struct InternalNameQuery {
    #[serde(rename = "internalName")]
    internal_name: Option<String>,
}

async fn all_roles(State(state): State<AppState>) -> Json<Vec<Role>> {
    Json(state.roles.all())
}

async fn role_by_internal_name(
    State(state): State<AppState>,
    Query(query): Query<InternalNameQuery>,
) -> ApiResult<Response> {
    let Some(internal_name) = query_value(&query.internal_name) else {
        let value = query.internal_name.as_deref();
        return Ok(invalid_query("InvalidInternalName", "internalName", value));
    };

    let role = state
        .roles
        .get(internal_name)
        .ok_or_else(|| Error::RoleNotFound(internal_name.to_string()))?;
    Ok(Json(role).into_response())
}

pub fn roles_routes(state: AppState) -> Router {
    Router::new()
        .route("/roles/internal", get(all_roles))
        .route("/roles/internal/by-internal-name", get(role_by_internal_name))
        .route_layer(from_fn_with_state(state.verifier.clone(), require_internal_session))
        .with_state(state)
}

/// Wrap service routes with the `/api/v1` prefix, request ids and tracing
pub fn serve_routes(routes: Router) -> Router {
    Router::new().nest(API_PREFIX, routes).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

/// All three services in one router
pub fn create_router(state: AppState) -> Router {
    serve_routes(
        auth_routes(state.clone())
            .merge(users_routes(state.clone()))
            .merge(roles_routes(state)),
    )
}
