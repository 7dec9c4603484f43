//! Login endpoint: exchange email/password for a bearer token.
//!
//! Flow Overview: validate field presence first, then verify the
//! credential against the stored hash, then issue a replacement token.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::error;

use super::passwords::verify_password;
use super::state::AuthState;
use super::types::{DetailResponse, FieldErrors, INVALID_CREDENTIALS, LoginRequest, TokenResponse};
use super::utils::normalize_email;

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, bearer token issued", body = TokenResponse),
        (status = 400, description = "Missing username or password; body maps each missing field to a message"),
        (status = 401, description = "Unknown email or wrong password", body = DetailResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    // A missing body counts the same as an empty one: both fields missing.
    let request = payload.map(|Json(payload)| payload);

    let mut errors = FieldErrors::new();
    let username = errors.require(
        "username",
        request.as_ref().and_then(|r| r.username.as_deref()),
    );
    let password = errors.require(
        "password",
        request.as_ref().and_then(|r| r.password.as_deref()),
    );
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }
    // Both are present once validation passed.
    let (Some(username), Some(password)) = (username, password) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let email = normalize_email(username);
    let user = match state.store().find_by_email(&email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to lookup user for login: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Unknown email and wrong password are indistinguishable to the caller.
    let Some(user) = user else {
        return invalid_credentials();
    };
    if !verify_password(password, &user.password_hash) {
        return invalid_credentials();
    }

    match state.tokens().issue(user.id).await {
        Ok(token) => (StatusCode::OK, Json(TokenResponse { token })).into_response(),
        Err(err) => {
            error!("Failed to issue auth token: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn invalid_credentials() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(DetailResponse::new(INVALID_CREDENTIALS)),
    )
        .into_response()
}
