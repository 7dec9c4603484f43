//! Out-of-band delivery of generated passwords.
//!
//! The reset flow hands `(user, plaintext)` to a [`PasswordNotifier`] and
//! never reports delivery problems to the caller. The default sender for
//! local dev is [`LogNotifier`], which logs the delivery without the
//! secret and returns `Ok(())`. [`WebhookNotifier`] posts the payload to
//! a delivery endpoint (mail gateway, queue bridge) over HTTPS.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::info;

use crate::store::UserRecord;

/// Delivery abstraction for newly generated passwords.
#[async_trait]
pub trait PasswordNotifier: Send + Sync {
    /// Deliver the plaintext to the user or return an error.
    async fn notify(&self, user: &UserRecord, password: &SecretString) -> Result<()>;
}

/// Local dev sender that logs the delivery instead of sending anything.
/// The password itself stays out of the logs.
#[derive(Clone, Debug)]
pub struct LogNotifier;

#[async_trait]
impl PasswordNotifier for LogNotifier {
    async fn notify(&self, user: &UserRecord, _password: &SecretString) -> Result<()> {
        info!(email = %user.email, "password notification stub");
        Ok(())
    }
}

/// Sender that posts `{email, password}` to a configured delivery URL.
#[derive(Clone, Debug)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build notifier HTTP client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl PasswordNotifier for WebhookNotifier {
    async fn notify(&self, user: &UserRecord, password: &SecretString) -> Result<()> {
        let payload = json!({
            "email": user.email,
            "password": password.expose_secret(),
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .context("failed to send password notification")?;

        let status = response.status();
        if status.is_success() {
            info!(email = %user.email, "password notification delivered");
            Ok(())
        } else {
            Err(anyhow!("password notification rejected: {status}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserRecord {
        UserRecord {
            id: Uuid::nil(),
            email: "user@example.com".to_string(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
            is_superuser: false,
            needs_change_password: true,
        }
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() -> Result<()> {
        let notifier = LogNotifier;
        notifier
            .notify(&user(), &SecretString::from("123".to_string()))
            .await
    }

    #[test]
    fn webhook_notifier_builds_client() -> Result<()> {
        let notifier = WebhookNotifier::new("https://notify.example.test/send".to_string())?;
        assert_eq!(notifier.url, "https://notify.example.test/send");
        Ok(())
    }
}
