//! REST API tests
//! Every route of the merged router, driven with `oneshot`

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use trellis_auth_core::{unix_now, Claims, ErrorBody, SecretKey, Secrets, TokenCodec};
use trellis_users_core::{
    create_router, init, seed_users, AppState, NewUser, Role, ServiceConfig, UserProfile,
};

const SIGNING_KEY: &str = "rest-api-signing-key";
const PASSWORD: &str = "Tr0ub4dor&Horse!";

struct TestApp {
    router: Router,
    state: AppState,
}

async fn app() -> TestApp {
    let secrets = Secrets::from_keys(
        SecretKey::new(SIGNING_KEY),
        SecretKey::new("rest-api-password-key"),
    );
    let state = init(&ServiceConfig::default(), &secrets).unwrap();

    let petar = NewUser {
        name: "Petar".to_string(),
        password: PASSWORD.to_string(),
        role: "regularUser".to_string(),
        sex: Some("male".to_string()),
        title: None,
    };
    assert_eq!(seed_users(&state, &[petar]).await, 1);

    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

fn internal_token() -> String {
    let codec = TokenCodec::new(&SecretKey::new(SIGNING_KEY));
    codec.encode_claims(&Claims::internal(unix_now() + 60)).unwrap()
}

struct Reply {
    status: StatusCode,
    authorization: Option<String>,
    request_id: Option<String>,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn error(&self) -> ErrorBody {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn token(&self) -> String {
        let header = self.authorization.as_deref().unwrap();
        header.strip_prefix("Bearer ").unwrap().to_string()
    }
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let header_text = |name: &str| {
        response
            .headers()
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
    };
    let authorization = header_text("authorization");
    let request_id = header_text("x-request-id");
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();

    Reply {
        status,
        authorization,
        request_id,
        body,
    }
}

async fn get(router: &Router, uri: &str, token: &str) -> Reply {
    send(router, Method::GET, uri, Some(token), None).await
}

async fn login(router: &Router) -> Reply {
    send(
        router,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"user": {"name": "Petar", "password": PASSWORD}})),
    )
    .await
}

#[tokio::test]
async fn test_login_returns_profile_and_token_header() {
    let app = app().await;
    let reply = login(&app.router).await;
    assert_eq!(reply.status, StatusCode::OK);

    let profile: UserProfile = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(profile.name, "Petar");
    assert_eq!(profile.role.internal_name, "regularUser");
    assert_eq!(profile.role.ui_name, "user");

    // The token travels only in the header
    let body = reply.json();
    assert!(body.get("token").is_none());
    assert!(body.get("encryptedPassword").is_none());
    assert!(app.state.verifier.verify(reply.authorization.as_deref()).is_ok());
    assert!(reply.request_id.is_some());
}

#[tokio::test]
async fn test_login_rejections() {
    let app = app().await;
    let bodies = [
        json!({"user": {"name": "Petar", "password": "wrong"}}),
        json!({"user": {"name": "Nobody", "password": PASSWORD}}),
        json!({"user": {"name": "Petar"}}),
        json!({}),
        json!("not an object"),
    ];

    for body in bodies {
        let reply = send(&app.router, Method::POST, "/api/v1/auth/login", None, Some(body)).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        let error = reply.error();
        assert_eq!(error.error_code, "UserInputError");
        assert_eq!(error.error_message, "Invalid User name and/or password");
        assert!(reply.authorization.is_none());
    }
}

#[tokio::test]
async fn test_my_session_returns_claims() {
    let app = app().await;
    let token = login(&app.router).await.token();

    let reply = send(&app.router, Method::GET, "/api/v1/users/mine", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let claims = reply.json();
    assert_eq!(claims["user"]["name"], "Petar");
    assert_eq!(claims["user"]["role"]["internalName"], "regularUser");
    assert!(claims["exp"].as_i64().unwrap() > unix_now());
}

#[tokio::test]
async fn test_my_session_requires_token() {
    let app = app().await;

    let reply = send(&app.router, Method::GET, "/api/v1/users/mine", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.error().error_code, "Unauthenticated");

    let reply = send(&app.router, Method::GET, "/api/v1/users/mine", Some("garbage"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_profile_reissues_token() {
    let app = app().await;
    let token = login(&app.router).await.token();

    let reply = send(
        &app.router,
        Method::PUT,
        "/api/v1/users/mine",
        Some(&token),
        Some(json!({"title": "Prof."})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["title"], "Prof.");
    assert_eq!(reply.json()["sex"], "male");

    let session = app.state.verifier.verify(reply.authorization.as_deref()).unwrap();
    assert_eq!(session.user().unwrap().title.as_deref(), Some("Prof."));
}

#[tokio::test]
async fn test_update_profile_validation() {
    let app = app().await;
    let token = login(&app.router).await.token();

    let reply = send(
        &app.router,
        Method::PUT,
        "/api/v1/users/mine",
        Some(&token),
        Some(json!({"title": "x".repeat(40)})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error().error_code, "UserInputError");

    let reply = send(
        &app.router,
        Method::PUT,
        "/api/v1/users/mine",
        Some(&token),
        Some(json!({"title": 7})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_password() {
    let app = app().await;
    let token = login(&app.router).await.token();

    let reply = send(
        &app.router,
        Method::PUT,
        "/api/v1/users/mine/password",
        Some(&token),
        Some(json!({"newPassword": "C0rrect#Horse!Battery"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert!(app.state.verifier.verify(reply.authorization.as_deref()).is_ok());

    // Old token still works, old password does not
    let reply = send(&app.router, Method::GET, "/api/v1/users/mine", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(login(&app.router).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_rejects_weak_password() {
    let app = app().await;
    let token = login(&app.router).await.token();

    let reply = send(
        &app.router,
        Method::PUT,
        "/api/v1/users/mine/password",
        Some(&token),
        Some(json!({"newPassword": "abc"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error().error_code, "WeakPassword");
    assert_eq!(login(&app.router).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_user_by_id_is_internal_only() {
    let app = app().await;
    let user_token = login(&app.router).await.token();
    let session = app
        .state
        .verifier
        .verify(Some(&format!("Bearer {}", user_token)))
        .unwrap();
    let user_id = session.user().unwrap().id.clone();
    let uri = format!("/api/v1/users/internal/by-id?userId={}", user_id);

    let reply = send(&app.router, Method::GET, &uri, Some(&user_token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.error().error_code, "InternalUseOnly");

    let reply = send(&app.router, Method::GET, &uri, Some(&internal_token()), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let profile: UserProfile = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(profile.id, user_id);
    assert_eq!(profile.role.permissions.len(), 3);
}

#[tokio::test]
async fn test_user_by_id_errors() {
    let app = app().await;
    let token = internal_token();

    let reply = get(&app.router, "/api/v1/users/internal/by-id", &token).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error().error_code, "InvalidUserId");

    let reply = get(&app.router, "/api/v1/users/internal/by-id?userId=missing", &token).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.error().error_code, "UserNotFound");
}

#[tokio::test]
async fn test_roles_routes() {
    let app = app().await;
    let token = internal_token();

    let reply = send(&app.router, Method::GET, "/api/v1/roles/internal", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let roles: Vec<Role> = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(roles.len(), 3);

    let reply = send(
        &app.router,
        Method::GET,
        "/api/v1/roles/internal/by-internal-name?internalName=guestSinger",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["uiName"], "singer");

    let reply = send(
        &app.router,
        Method::GET,
        "/api/v1/roles/internal/by-internal-name?internalName=root",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.error().error_code, "RoleByInternalNameNotFound");

    let reply = send(
        &app.router,
        Method::GET,
        "/api/v1/roles/internal/by-internal-name?internalName=",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error().error_code, "InvalidInternalName");
}

#[tokio::test]
async fn test_query_values_are_not_trimmed() {
    let app = app().await;
    let token = internal_token();

    let uri = "/api/v1/roles/internal/by-internal-name?internalName=%20admin";
    let reply = get(&app.router, uri, &token).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.error().error_code, "RoleByInternalNameNotFound");

    let uri = "/api/v1/roles/internal/by-internal-name?internalName=%20";
    let reply = get(&app.router, uri, &token).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = get(&app.router, "/api/v1/users/internal/by-id?userId=%20", &token).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.error().error_code, "UserNotFound");
}

#[tokio::test]
async fn test_roles_reject_user_and_expired_tokens() {
    let app = app().await;
    let user_token = login(&app.router).await.token();

    let reply = get(&app.router, "/api/v1/roles/internal", &user_token).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.error().error_code, "InternalUseOnly");

    let codec = TokenCodec::new(&SecretKey::new(SIGNING_KEY));
    let expired = codec.encode_claims(&Claims::internal(unix_now() - 1)).unwrap();
    let reply = get(&app.router, "/api/v1/roles/internal", &expired).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.error().error_code, "Unauthenticated");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = app().await;
    let request = Request::builder()
        .uri("/api/v1/users/mine")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}
