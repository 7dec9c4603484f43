//! Bearer-token session handling and the logout endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::state::AuthState;
use super::types::DetailResponse;
use crate::store::hash_token;

/// Resolve the bearer token to its owner, if any.
///
/// Returns `Ok(None)` when the header is missing or the token is unknown.
pub(crate) async fn authenticate_token(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Option<Uuid>, StatusCode> {
    let Some(token) = extract_bearer_token(headers) else {
        return Ok(None);
    };
    // Only the hash is stored; never compare raw tokens against the database.
    let token_hash = hash_token(&token);
    match state.tokens().resolve(&token_hash).await {
        Ok(owner) => Ok(owner),
        Err(err) => {
            error!("Failed to resolve auth token: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Token deleted and session terminated"),
        (status = 401, description = "Missing or invalid bearer token", body = DetailResponse)
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let Some(token) = extract_bearer_token(&headers) else {
        return unauthorized();
    };

    let token_hash = hash_token(&token);
    match state.tokens().revoke(&token_hash).await {
        // Exactly the caller's token is deleted; everyone else's survive.
        Ok(true) => (StatusCode::OK, Json(serde_json::json!({}))).into_response(),
        Ok(false) => unauthorized(),
        Err(err) => {
            error!("Failed to delete auth token: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(DetailResponse::new(
            "Authentication credentials were not provided.",
        )),
    )
        .into_response()
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extract_bearer_token_reads_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_bearer_token_accepts_lowercase_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_bearer_token_rejects_other_schemes_and_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
