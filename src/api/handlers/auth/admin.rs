//! Role-gated redirect into the admin site.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, header::LOCATION},
    response::IntoResponse,
};
use std::sync::Arc;

use super::principal::{Permission, require_auth};
use super::state::AuthState;

#[utoipa::path(
    get,
    path = "/v1/auth/admin",
    responses(
        (status = 302, description = "Staff callers land on the admin survey changelist, everyone else on the configured root")
    ),
    tag = "auth"
)]
pub async fn admin_redirect(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let config = state.config();
    // Anonymous callers and lookup failures both fall through to the root
    // target; the gate never reveals why access was denied.
    let target = match require_auth(&headers, &state).await {
        Ok(principal) if principal.has(Permission::AdminSite) => config.admin_changelist_path(),
        _ => config.root_path(),
    };

    (StatusCode::FOUND, [(LOCATION, target.to_string())]).into_response()
}
