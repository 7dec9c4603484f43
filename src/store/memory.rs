//! In-memory credential store for `memory://` runs and tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, TokenIssuer, UserRecord, generate_token, hash_token};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserRecord>,
    /// token hash -> owning user
    tokens: HashMap<Vec<u8>, Uuid>,
}

/// Credential store backed by process memory.
///
/// A single lock guards users and tokens so each request sees one
/// consistent unit of work, mirroring the transactional Postgres backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user record. Provisioning is out of band for the HTTP API,
    /// so this is only reachable from local setup code and tests.
    ///
    /// # Errors
    /// Returns an error when the email is already taken.
    pub async fn insert_user(&self, user: UserRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|existing| existing.email == user.email)
        {
            return Err(anyhow!("email already registered: {}", user.email));
        }
        inner.users.insert(user.id, user);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn set_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        needs_change_password: bool,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&user_id) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        user.needs_change_password = needs_change_password;
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TokenIssuer for MemoryStore {
    async fn issue(&self, user_id: Uuid) -> Result<String> {
        let token = generate_token()?;
        let token_hash = hash_token(&token);
        let mut inner = self.inner.write().await;
        // One live token per user: drop any previous hash before inserting.
        inner.tokens.retain(|_, owner| *owner != user_id);
        inner.tokens.insert(token_hash, user_id);
        Ok(token)
    }

    async fn resolve(&self, token_hash: &[u8]) -> Result<Option<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner.tokens.get(token_hash).copied())
    }

    async fn revoke(&self, token_hash: &[u8]) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.tokens.remove(token_hash).is_some())
    }
}
