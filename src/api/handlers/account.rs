//! Authenticated self-service endpoints and password reset.
//!
//! Flow Overview:
//! 1) Authenticate via bearer token (reset is the exception).
//! 2) Validate input into per-field errors before touching storage.
//! 3) Apply the mutation and answer with plain status JSON.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::error;

use super::auth::AuthState;
use super::auth::passwords::hash_password;
use super::auth::principal::require_auth;
use super::auth::types::{
    AccountResponse, FieldErrors, PASSWORD_MISMATCH, PasswordChangeRequest, PasswordResetRequest,
};
use super::auth::utils::{normalize_email, valid_email};

const INVALID_EMAIL: &str = "Enter a valid email address.";

#[utoipa::path(
    get,
    path = "/v1/account",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = AccountResponse),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    tag = "account"
)]
pub async fn account_detail(
    headers: axum::http::HeaderMap,
    state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let response = AccountResponse {
        email: principal.email,
        first_name: principal.first_name,
        last_name: principal.last_name,
        needs_change_password: principal.needs_change_password,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/account/password",
    request_body = PasswordChangeRequest,
    responses(
        (status = 200, description = "Password replaced, pending-change flag cleared"),
        (status = 400, description = "Missing or mismatched fields; body maps each field to a message"),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    tag = "account"
)]
pub async fn change_password(
    headers: axum::http::HeaderMap,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<PasswordChangeRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let request = payload.map(|Json(payload)| payload);
    let mut errors = FieldErrors::new();
    let password_1 = errors.require(
        "password_1",
        request.as_ref().and_then(|r| r.password_1.as_deref()),
    );
    let password_2 = errors.require(
        "password_2",
        request.as_ref().and_then(|r| r.password_2.as_deref()),
    );
    if let (Some(first), Some(second)) = (password_1, password_2) {
        if first != second {
            errors.insert("password_2", PASSWORD_MISMATCH);
        }
    }
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }
    let Some(password) = password_1 else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let password_hash = match hash_password(password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state
        .store()
        .set_password(principal.user_id, &password_hash, false)
        .await
    {
        Ok(true) => (StatusCode::OK, Json(serde_json::json!({}))).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to store new password: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/account/password/reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Accepted; the response never reveals whether the email exists"),
        (status = 400, description = "Missing email; body maps the field to a message")
    ),
    tag = "account"
)]
pub async fn reset_password(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<PasswordResetRequest>>,
) -> impl IntoResponse {
    let request = payload.map(|Json(payload)| payload);
    let mut errors = FieldErrors::new();
    let email = errors.require("email", request.as_ref().and_then(|r| r.email.as_deref()));
    let email = email.map(normalize_email);
    if let Some(email) = email.as_deref() {
        if !valid_email(email) {
            errors.insert("email", INVALID_EMAIL);
        }
    }
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }
    let Some(email) = email else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let user = match state.store().find_by_email(&email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to lookup user for reset: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Unknown emails are a silent no-op to avoid account probing.
    let Some(user) = user else {
        return (StatusCode::OK, Json(serde_json::json!({}))).into_response();
    };

    let password = state.passwords().generate();
    let password_hash = match hash_password(password.expose_secret()) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash generated password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // The pending-change flag forces the user off the generated password.
    match state.store().set_password(user.id, &password_hash, true).await {
        Ok(_) => {}
        Err(err) => {
            error!("Failed to store generated password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    // Delivery is out-of-band; failures are logged and the response stays 200.
    if let Err(err) = state.notifier().notify(&user, &password).await {
        error!(email = %user.email, "Failed to deliver password notification: {err}");
    }

    (StatusCode::OK, Json(serde_json::json!({}))).into_response()
}
