//! Auth handlers and supporting modules.
//!
//! This module coordinates credential verification, bearer-token
//! sessions, and the role-gated admin redirect.
//!
//! ## Tokens
//!
//! A user holds at most one live token. Login issues a replacement,
//! logout deletes it, and only SHA-256 hashes of tokens are persisted.
//!
//! ## Validation
//!
//! Handlers collect per-field errors into a `{field: message}` object
//! and answer 400 before any business logic runs.

pub(crate) mod admin;
pub(crate) mod login;
pub(crate) mod passwords;
pub(crate) mod principal;
pub(crate) mod session;
mod state;
pub(crate) mod types;
pub(crate) mod utils;

pub use passwords::{PasswordGenerator, RandomPasswordGenerator};
pub use state::{AuthConfig, AuthState};

#[cfg(test)]
mod tests;
