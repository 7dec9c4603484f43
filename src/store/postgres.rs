//! PostgreSQL credential store.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row};
use tracing::{Instrument, info_span};
use uuid::Uuid;

use super::{CredentialStore, TokenIssuer, UserRecord, generate_token, hash_token};

const USER_COLUMNS: &str = r"
    id, email, password_hash, first_name, last_name,
    is_staff, is_superuser, needs_change_password
";

/// Credential store backed by PostgreSQL via sqlx.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        is_staff: row.get("is_staff"),
        is_superuser: row.get("is_superuser"),
        needs_change_password: row.get("needs_change_password"),
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 LIMIT 1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 LIMIT 1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn set_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        needs_change_password: bool,
    ) -> Result<bool> {
        // Transaction keeps the read-then-write on the user row atomic.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin password transaction")?;

        let query = r"
            UPDATE users
            SET password_hash = $2,
                needs_change_password = $3,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(password_hash)
            .bind(needs_change_password)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to update password")?;

        tx.commit().await.context("commit password transaction")?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        async {
            let mut conn = self.pool.acquire().await?;
            conn.ping().await?;
            Ok::<(), sqlx::Error>(())
        }
        .instrument(span)
        .await
        .context("failed to ping database")
    }
}

#[async_trait]
impl TokenIssuer for PgStore {
    async fn issue(&self, user_id: Uuid) -> Result<String> {
        // user_id is the primary key, so the upsert replaces any previous
        // token and keeps the one-live-token-per-user invariant in the
        // database itself.
        let query = r"
            INSERT INTO auth_tokens (user_id, token_hash)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET token_hash = EXCLUDED.token_hash, created_at = NOW()
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        for _ in 0..3 {
            let token = generate_token()?;
            let token_hash = hash_token(&token);
            let result = sqlx::query(query)
                .bind(user_id)
                .bind(&token_hash)
                .execute(&self.pool)
                .instrument(span.clone())
                .await;

            match result {
                Ok(_) => return Ok(token),
                // Retried only on the astronomically unlikely hash collision
                // with another user's token.
                Err(err) if is_unique_violation(&err) => {}
                Err(err) => return Err(err).context("failed to insert auth token"),
            }
        }

        Err(anyhow!("failed to generate unique auth token"))
    }

    async fn resolve(&self, token_hash: &[u8]) -> Result<Option<Uuid>> {
        let query = r"
            SELECT user_id
            FROM auth_tokens
            WHERE token_hash = $1
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to resolve auth token")?;
        Ok(row.map(|row| row.get("user_id")))
    }

    async fn revoke(&self, token_hash: &[u8]) -> Result<bool> {
        let query = "DELETE FROM auth_tokens WHERE token_hash = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete auth token")?;
        Ok(result.rows_affected() > 0)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
