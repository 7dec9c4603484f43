//! Request/response types for auth and account endpoints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub(crate) const REQUIRED_FIELD: &str = "This field is required.";
pub(crate) const PASSWORD_MISMATCH: &str = "Passwords do not match.";
pub(crate) const INVALID_CREDENTIALS: &str = "Unable to log in with the provided credentials.";

/// Per-field validation errors, collected before any business logic runs
/// and serialized as a `{field: message}` object.
#[derive(Debug, Default, Serialize)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a missing-field error unless the value is present and
    /// non-blank; returns the trimmed value when it passes.
    pub(crate) fn require<'a>(
        &mut self,
        field: &'static str,
        value: Option<&'a str>,
    ) -> Option<&'a str> {
        match value.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => Some(value),
            None => {
                self.0.insert(field, REQUIRED_FIELD.to_string());
                None
            }
        }
    }

    pub(crate) fn insert(&mut self, field: &'static str, message: &str) {
        self.0.insert(field, message.to_string());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fields may be absent entirely; presence checks drive the 400 response.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountResponse {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub needs_change_password: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordChangeRequest {
    pub password_1: Option<String>,
    pub password_2: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordResetRequest {
    pub email: Option<String>,
}

/// Error body for 401 responses.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DetailResponse {
    pub detail: String,
}

impl DetailResponse {
    pub(crate) fn new(detail: &str) -> Self {
        Self {
            detail: detail.to_string(),
        }
    }
}
