//! Session lifecycle tests
//! Secrets on disk, two service instances, login and re-issue across them

use std::fs;

use tempfile::TempDir;
use trellis_auth_core::{unix_now, AuthError, RouteAccess, Secrets, SecretsConfig};
use trellis_users_core::{init, seed_users, AppState, Error, NewUser, ServiceConfig};

const PASSWORD: &str = "Sup3r$ecret!Pass";

fn secrets_dir() -> (TempDir, SecretsConfig) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("jwt"), "lifecycle-signing-secret").unwrap();
    fs::write(dir.path().join("user-password"), "lifecycle-password-secret").unwrap();

    let config = SecretsConfig {
        dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    (dir, config)
}

fn instance(secrets: &SecretsConfig) -> AppState {
    let config = ServiceConfig {
        secrets: secrets.clone(),
        ..Default::default()
    };
    init(&config, &Secrets::load(secrets).unwrap()).unwrap()
}

fn ana() -> NewUser {
    NewUser {
        name: "Ana".to_string(),
        password: PASSWORD.to_string(),
        role: "admin".to_string(),
        sex: Some("female".to_string()),
        title: Some("Ms.".to_string()),
    }
}

#[tokio::test]
async fn test_token_from_one_instance_verifies_on_another() {
    let (_dir, secrets) = secrets_dir();
    let issuing = instance(&secrets);
    let verifying = instance(&secrets);

    assert_eq!(seed_users(&issuing, &[ana()]).await, 1);
    let result = issuing.auth.login("Ana", PASSWORD).await.unwrap();

    let session = verifying
        .verifier
        .verify(Some(&result.session.authorization_header()))
        .unwrap();
    let user = session.user().unwrap();
    assert_eq!(user.name, "Ana");
    assert_eq!(user.role.internal_name, "admin");
    assert!(user.role.has_permission("canReadSystemLogs"));
    assert!(session.expires_at() > unix_now());
}

#[tokio::test]
async fn test_other_secret_rejects_token() {
    let (_dir, secrets) = secrets_dir();
    let issuing = instance(&secrets);
    seed_users(&issuing, &[ana()]).await;
    let result = issuing.auth.login("Ana", PASSWORD).await.unwrap();

    let (other_dir, other) = secrets_dir();
    fs::write(other_dir.path().join("jwt"), "a-different-signing-secret").unwrap();
    let foreign = instance(&other);

    assert_eq!(
        foreign.verifier.verify(Some(&result.session.authorization_header())),
        Err(AuthError::Unauthenticated)
    );
}

#[tokio::test]
async fn test_password_change_lifecycle() {
    let (_dir, secrets) = secrets_dir();
    let state = instance(&secrets);
    seed_users(&state, &[ana()]).await;

    let login = state.auth.login("Ana", PASSWORD).await.unwrap();
    let session = state.verifier.verify(Some(&login.session.authorization_header())).unwrap();

    let reissued = state.auth.change_password(&session, "N3w&Better#Pass").await.unwrap();
    assert!(reissued.expires_at() >= login.session.expires_at());

    // Both tokens stay valid until they expire
    for header in [login.session.authorization_header(), reissued.authorization_header()] {
        let verified = state.verifier.verify(Some(&header)).unwrap();
        assert_eq!(verified.user().unwrap().name, "Ana");
    }

    assert!(matches!(
        state.auth.login("Ana", PASSWORD).await,
        Err(Error::InvalidCredentials)
    ));
    assert!(state.auth.login("Ana", "N3w&Better#Pass").await.is_ok());
}

#[tokio::test]
async fn test_user_session_is_not_internal() {
    let (_dir, secrets) = secrets_dir();
    let state = instance(&secrets);
    seed_users(&state, &[ana()]).await;

    let login = state.auth.login("Ana", PASSWORD).await.unwrap();
    let header = login.session.authorization_header();

    assert!(state.verifier.verify_for(RouteAccess::Authenticated, Some(&header)).is_ok());
    assert_eq!(
        state.verifier.verify_for(RouteAccess::InternalOnly, Some(&header)),
        Err(AuthError::InternalUseOnly)
    );
}

#[tokio::test]
async fn test_seed_users_skips_invalid_entries() {
    let (_dir, secrets) = secrets_dir();
    let state = instance(&secrets);

    let weak = NewUser {
        name: "Weak".to_string(),
        password: "123".to_string(),
        ..ana()
    };
    assert_eq!(seed_users(&state, &[ana(), weak, ana()]).await, 1);
}

#[test]
fn test_missing_secret_fails_startup() {
    let (dir, secrets) = secrets_dir();
    fs::remove_file(dir.path().join("user-password")).unwrap();
    assert!(Secrets::load(&secrets).is_err());
}
