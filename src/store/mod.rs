//! Credential and token persistence.
//!
//! Handlers talk to storage through the [`CredentialStore`] and
//! [`TokenIssuer`] traits so the backend can be swapped: `PgStore` for
//! production, `MemoryStore` for `memory://` local runs and tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A stored user. The hash is an argon2id PHC string; plaintext passwords
/// never reach this layer.
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub needs_change_password: bool,
}

/// User lookups and credential mutations.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Look up a user by id.
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>>;

    /// Replace the stored hash and set the pending-change flag in one
    /// unit of work. Returns `false` when the user does not exist.
    async fn set_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        needs_change_password: bool,
    ) -> Result<bool>;

    /// Backend connectivity check for `/health`.
    async fn ping(&self) -> Result<()>;
}

/// Bearer token lifecycle. A user holds at most one live token.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Mint a token for the user, replacing any previous one, and return
    /// the raw value. Only the hash is persisted.
    async fn issue(&self, user_id: Uuid) -> Result<String>;

    /// Resolve a token hash to its owner, if the token is live.
    async fn resolve(&self, token_hash: &[u8]) -> Result<Option<Uuid>>;

    /// Delete the token matching the hash. Returns `false` when no token
    /// matched; other users' tokens are never touched.
    async fn revoke(&self, token_hash: &[u8]) -> Result<bool>;
}

/// Create a new bearer token.
/// The raw value is only returned to the caller; storage keeps a hash.
pub(crate) fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate auth token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a bearer token so raw values never touch the database.
/// The hash is used for lookups when the token is presented.
pub(crate) fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
