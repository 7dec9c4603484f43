//! Authenticated principal extraction and authorization helpers.
//!
//! Flow Overview: read the bearer token, resolve it to a user, and return
//! a principal that downstream handlers can use. Authorization decisions
//! go through [`Permission`] so gates check a capability, not a role name.

use axum::http::{HeaderMap, StatusCode};
use tracing::error;
use uuid::Uuid;

use super::session::authenticate_token;
use super::state::AuthState;

/// Capabilities a principal can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    /// Access to the admin site. Requires the staff flag specifically;
    /// a superuser without it is not admitted.
    AdminSite,
}

/// Authenticated user context derived from the bearer token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub needs_change_password: bool,
}

impl Principal {
    pub(crate) fn has(&self, permission: Permission) -> bool {
        match permission {
            Permission::AdminSite => self.is_staff,
        }
    }
}

/// Resolve a bearer token into a principal, or return 401.
pub(crate) async fn require_auth(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Principal, StatusCode> {
    let Some(user_id) = authenticate_token(headers, state).await? else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match state.store().find_by_id(user_id).await {
        Ok(Some(user)) => Ok(Principal {
            user_id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            needs_change_password: user.needs_change_password,
        }),
        // A token whose user vanished no longer authenticates anyone.
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            error!("Failed to load user for token: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
