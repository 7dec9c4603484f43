//! # Konto (Authentication & Account Management)
//!
//! `konto` is the authentication and account-management service of the
//! survey platform. It owns credentials, bearer tokens, and the
//! self-service account flows.
//!
//! ## Authentication
//!
//! Login exchanges an email/password pair for an opaque bearer token.
//! Passwords are stored as argon2id hashes; tokens are 32 random bytes
//! and only their SHA-256 hash touches the database. A user holds at
//! most one live token: login replaces it, logout deletes it.
//!
//! ## Account flows
//!
//! Authenticated users can read their profile and change their password.
//! Password reset is unauthenticated and deliberately non-revealing: the
//! endpoint answers `200 OK` whether or not the email exists, and only a
//! matching account gets a generated password delivered out-of-band.
//!
//! ## Admin gate
//!
//! `/v1/auth/admin` redirects staff users to the admin survey changelist
//! and everyone else to `/`. Both targets come from configuration, and
//! the gate is a capability check on the principal.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
