//! Auth and account endpoint tests.
//!
//! Handlers are driven through the real router with the in-memory store
//! and substituted generator/notifier collaborators.

use super::{AuthConfig, AuthState, PasswordGenerator};
use crate::api::handlers::auth::passwords::{hash_password, verify_password};
use crate::api::notify::PasswordNotifier;
use crate::api::router;
use crate::store::{CredentialStore, MemoryStore, UserRecord};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

/// Deterministic stand-in for the random generator.
struct FixedPasswordGenerator(&'static str);

impl PasswordGenerator for FixedPasswordGenerator {
    fn generate(&self) -> SecretString {
        SecretString::from(self.0.to_string())
    }
}

/// Records every delivery as `(email, plaintext)`.
#[derive(Default)]
struct RecordingNotifier {
    deliveries: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl PasswordNotifier for RecordingNotifier {
    async fn notify(&self, user: &UserRecord, password: &SecretString) -> Result<()> {
        self.deliveries
            .lock()
            .await
            .push((user.email.clone(), password.expose_secret().to_string()));
        Ok(())
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    state: Arc<AuthState>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = Arc::new(AuthState::new(
        AuthConfig::new("http://localhost:3000".to_string()),
        store.clone(),
        store.clone(),
        Arc::new(FixedPasswordGenerator("123")),
        notifier.clone(),
    ));
    TestApp {
        router: router(state.clone()),
        store,
        notifier,
        state,
    }
}

async fn seed_user(
    app: &TestApp,
    email: &str,
    password: &str,
    is_staff: bool,
    is_superuser: bool,
    needs_change_password: bool,
) -> Result<UserRecord> {
    let record = UserRecord {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: hash_password(password)?,
        first_name: "Alice".to_string(),
        last_name: "Doe".to_string(),
        is_staff,
        is_superuser,
        needs_change_password,
    };
    app.store.insert_user(record.clone()).await?;
    Ok(record)
}

fn post_json(uri: &str, body: &Value, token: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .context("failed to build POST request")
}

fn get_request(uri: &str, token: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::empty())
        .context("failed to build GET request")
}

async fn send_raw(app: &TestApp, request: Request<Body>) -> Result<axum::response::Response> {
    app.router
        .clone()
        .oneshot(request)
        .await
        .map_err(|err| anyhow!("request failed: {err}"))
}

async fn send(app: &TestApp, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = send_raw(app, request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .context("failed to read response body")?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).context("response body is not JSON")?
    };
    Ok((status, body))
}

async fn login(app: &TestApp, username: &str, password: &str) -> Result<String> {
    let request = post_json(
        "/v1/auth/login",
        &json!({"username": username, "password": password}),
        None,
    )?;
    let (status, body) = send(app, request).await?;
    if status != StatusCode::OK {
        return Err(anyhow!("login failed with {status}: {body}"));
    }
    body.get("token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("missing token in login response")
}

#[tokio::test]
async fn login_returns_token_for_valid_credentials() -> Result<()> {
    let app = test_app();
    seed_user(&app, "foo@foo.com", "123123", false, false, false).await?;

    let token = login(&app, "foo@foo.com", "123123").await?;
    assert!(!token.is_empty());

    // The token authenticates follow-up requests.
    let (status, _) = send(&app, get_request("/v1/account", Some(&token))?).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_with_empty_payload_names_both_fields() -> Result<()> {
    let app = test_app();

    let request = post_json("/v1/auth/login", &json!({}), None)?;
    let (status, body) = send(&app, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("username").is_some());
    assert!(body.get("password").is_some());
    Ok(())
}

#[tokio::test]
async fn login_rejects_bad_credentials() -> Result<()> {
    let app = test_app();
    seed_user(&app, "foo@foo.com", "123123", false, false, false).await?;

    let request = post_json(
        "/v1/auth/login",
        &json!({"username": "foo@foo.com", "password": "wrong"}),
        None,
    )?;
    let (status, body) = send(&app, request).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("detail").is_some());
    Ok(())
}

#[tokio::test]
async fn login_normalizes_the_email() -> Result<()> {
    let app = test_app();
    seed_user(&app, "foo@foo.com", "123123", false, false, false).await?;

    let token = login(&app, " Foo@Foo.COM ", "123123").await?;
    assert!(!token.is_empty());
    Ok(())
}

#[tokio::test]
async fn login_replaces_the_previous_token() -> Result<()> {
    let app = test_app();
    seed_user(&app, "foo@foo.com", "123123", false, false, false).await?;

    let first = login(&app, "foo@foo.com", "123123").await?;
    let second = login(&app, "foo@foo.com", "123123").await?;
    assert_ne!(first, second);

    let (status, _) = send(&app, get_request("/v1/account", Some(&first))?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, get_request("/v1/account", Some(&second))?).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn logout_requires_authentication() -> Result<()> {
    let app = test_app();

    let (status, _) = send(&app, get_request("/v1/auth/logout", None)?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_deletes_only_the_callers_token() -> Result<()> {
    let app = test_app();
    seed_user(&app, "foo@foo.com", "123123", false, false, false).await?;
    seed_user(&app, "bar@bar.com", "456456", false, false, false).await?;

    let foo_token = login(&app, "foo@foo.com", "123123").await?;
    let bar_token = login(&app, "bar@bar.com", "456456").await?;

    let (status, _) = send(&app, get_request("/v1/auth/logout", Some(&foo_token))?).await?;
    assert_eq!(status, StatusCode::OK);

    // The caller is signed out, the other user's token survives.
    let (status, _) = send(&app, get_request("/v1/account", Some(&foo_token))?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, get_request("/v1/account", Some(&bar_token))?).await?;
    assert_eq!(status, StatusCode::OK);

    // A second logout with the dead token is unauthorized again.
    let (status, _) = send(&app, get_request("/v1/auth/logout", Some(&foo_token))?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn account_detail_requires_authentication() -> Result<()> {
    let app = test_app();

    let (status, _) = send(&app, get_request("/v1/account", None)?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn account_detail_projects_the_user() -> Result<()> {
    let app = test_app();
    seed_user(&app, "foo@foo.com", "123123", false, false, true).await?;
    let token = login(&app, "foo@foo.com", "123123").await?;

    let (status, body) = send(&app, get_request("/v1/account", Some(&token))?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("email").and_then(Value::as_str), Some("foo@foo.com"));
    assert_eq!(body.get("first_name").and_then(Value::as_str), Some("Alice"));
    assert_eq!(body.get("last_name").and_then(Value::as_str), Some("Doe"));
    assert_eq!(
        body.get("needs_change_password").and_then(Value::as_bool),
        Some(true)
    );
    Ok(())
}

#[tokio::test]
async fn change_password_requires_authentication() -> Result<()> {
    let app = test_app();

    let request = post_json(
        "/v1/account/password",
        &json!({"password_1": "123", "password_2": "123"}),
        None,
    )?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn change_password_with_empty_payload_names_both_fields() -> Result<()> {
    let app = test_app();
    seed_user(&app, "foo@foo.com", "123123", false, false, true).await?;
    let token = login(&app, "foo@foo.com", "123123").await?;

    let request = post_json("/v1/account/password", &json!({}), Some(&token))?;
    let (status, body) = send(&app, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("password_1").is_some());
    assert!(body.get("password_2").is_some());
    Ok(())
}

#[tokio::test]
async fn change_password_rejects_mismatched_fields() -> Result<()> {
    let app = test_app();
    seed_user(&app, "foo@foo.com", "123123", false, false, true).await?;
    let token = login(&app, "foo@foo.com", "123123").await?;

    let request = post_json(
        "/v1/account/password",
        &json!({"password_1": "123", "password_2": "456"}),
        Some(&token),
    )?;
    let (status, body) = send(&app, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("password_1").is_none());
    assert!(body.get("password_2").is_some());
    Ok(())
}

#[tokio::test]
async fn change_password_updates_hash_and_clears_flag() -> Result<()> {
    let app = test_app();
    seed_user(&app, "foo@foo.com", "123123", false, false, true).await?;
    let token = login(&app, "foo@foo.com", "123123").await?;

    let request = post_json(
        "/v1/account/password",
        &json!({"password_1": "123", "password_2": "123"}),
        Some(&token),
    )?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);

    let user = app
        .store
        .find_by_email("foo@foo.com")
        .await?
        .context("user vanished")?;
    assert!(verify_password("123", &user.password_hash));
    assert!(!verify_password("123123", &user.password_hash));
    assert!(!user.needs_change_password);
    Ok(())
}

#[tokio::test]
async fn password_reset_with_empty_payload_names_the_email_field() -> Result<()> {
    let app = test_app();

    let request = post_json("/v1/account/password/reset", &json!({}), None)?;
    let (status, body) = send(&app, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("email").is_some());
    Ok(())
}

#[tokio::test]
async fn password_reset_rejects_malformed_emails() -> Result<()> {
    let app = test_app();

    let request = post_json(
        "/v1/account/password/reset",
        &json!({"email": "not-an-email"}),
        None,
    )?;
    let (status, body) = send(&app, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("email").is_some());
    assert!(app.notifier.deliveries.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn password_reset_rotates_password_and_notifies_once() -> Result<()> {
    let app = test_app();
    seed_user(&app, "email@email.com", "old-password", false, false, false).await?;

    let request = post_json(
        "/v1/account/password/reset",
        &json!({"email": "email@email.com"}),
        None,
    )?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);

    let user = app
        .store
        .find_by_email("email@email.com")
        .await?
        .context("user vanished")?;
    assert!(verify_password("123", &user.password_hash));
    assert!(!verify_password("old-password", &user.password_hash));
    assert!(user.needs_change_password);

    let deliveries = app.notifier.deliveries.lock().await;
    assert_eq!(
        *deliveries,
        [("email@email.com".to_string(), "123".to_string())]
    );
    Ok(())
}

#[tokio::test]
async fn password_reset_for_unknown_email_is_a_silent_noop() -> Result<()> {
    let app = test_app();
    seed_user(&app, "email@email.com", "old-password", false, false, false).await?;

    let request = post_json(
        "/v1/account/password/reset",
        &json!({"email": "email@other.com"}),
        None,
    )?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);

    let user = app
        .store
        .find_by_email("email@email.com")
        .await?
        .context("user vanished")?;
    assert!(verify_password("old-password", &user.password_hash));
    assert!(!user.needs_change_password);
    assert!(app.notifier.deliveries.lock().await.is_empty());
    Ok(())
}

fn location_header(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn admin_redirect_sends_anonymous_callers_to_root() -> Result<()> {
    let app = test_app();

    let response = send_raw(&app, get_request("/v1/auth/admin", None)?).await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location_header(&response).as_deref(), Some("/"));
    Ok(())
}

#[tokio::test]
async fn admin_redirect_sends_non_staff_callers_to_root() -> Result<()> {
    let app = test_app();
    // A superuser without the staff flag is still turned away.
    seed_user(&app, "foo@foo.com", "123123", false, true, false).await?;
    let token = login(&app, "foo@foo.com", "123123").await?;

    let response = send_raw(&app, get_request("/v1/auth/admin", Some(&token))?).await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location_header(&response).as_deref(), Some("/"));
    Ok(())
}

#[tokio::test]
async fn admin_redirect_sends_staff_to_the_changelist() -> Result<()> {
    let app = test_app();
    seed_user(&app, "foo@foo.com", "123123", true, true, false).await?;
    let token = login(&app, "foo@foo.com", "123123").await?;

    let response = send_raw(&app, get_request("/v1/auth/admin", Some(&token))?).await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location_header(&response).as_deref(),
        Some(app.state.config().admin_changelist_path())
    );
    Ok(())
}

#[tokio::test]
async fn admin_redirect_target_comes_from_configuration() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = Arc::new(AuthState::new(
        AuthConfig::new("http://localhost:3000".to_string())
            .with_admin_changelist_path("/admin/polls/poll/".to_string()),
        store.clone(),
        store.clone(),
        Arc::new(FixedPasswordGenerator("123")),
        notifier.clone(),
    ));
    let app = TestApp {
        router: router(state.clone()),
        store,
        notifier,
        state,
    };
    seed_user(&app, "staff@foo.com", "123123", true, false, false).await?;
    let token = login(&app, "staff@foo.com", "123123").await?;

    let response = send_raw(&app, get_request("/v1/auth/admin", Some(&token))?).await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location_header(&response).as_deref(),
        Some("/admin/polls/poll/")
    );
    assert_eq!(
        app.state.config().admin_changelist_path(),
        "/admin/polls/poll/"
    );
    Ok(())
}

#[tokio::test]
async fn health_reports_ok_with_memory_store() -> Result<()> {
    let app = test_app();

    let (status, body) = send(&app, get_request("/health", None)?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("store").and_then(Value::as_str), Some("ok"));
    assert_eq!(
        body.get("name").and_then(Value::as_str),
        Some(env!("CARGO_PKG_NAME"))
    );
    Ok(())
}
