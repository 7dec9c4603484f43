//! Auth configuration and shared handler state.

use std::sync::Arc;

use super::passwords::{DEFAULT_RESET_PASSWORD_LENGTH, PasswordGenerator};
use crate::api::notify::PasswordNotifier;
use crate::store::{CredentialStore, TokenIssuer};

const DEFAULT_ROOT_PATH: &str = "/";
const DEFAULT_ADMIN_CHANGELIST_PATH: &str = "/admin/surveys/survey/";

/// Process-wide auth settings. Redirect targets live here so they are
/// introspectable rather than buried in handler bodies.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    root_path: String,
    admin_changelist_path: String,
    reset_password_length: usize,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            root_path: DEFAULT_ROOT_PATH.to_string(),
            admin_changelist_path: DEFAULT_ADMIN_CHANGELIST_PATH.to_string(),
            reset_password_length: DEFAULT_RESET_PASSWORD_LENGTH,
        }
    }

    #[must_use]
    pub fn with_root_path(mut self, path: String) -> Self {
        self.root_path = path;
        self
    }

    #[must_use]
    pub fn with_admin_changelist_path(mut self, path: String) -> Self {
        self.admin_changelist_path = path;
        self
    }

    #[must_use]
    pub fn with_reset_password_length(mut self, length: usize) -> Self {
        self.reset_password_length = length;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Redirect target for unauthenticated or non-staff callers.
    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Redirect target for staff callers: the admin survey changelist.
    #[must_use]
    pub fn admin_changelist_path(&self) -> &str {
        &self.admin_changelist_path
    }

    #[must_use]
    pub fn reset_password_length(&self) -> usize {
        self.reset_password_length
    }
}

/// Collaborators shared by every handler: configuration, the credential
/// store, the token issuer, and the reset-flow generator/notifier.
pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenIssuer>,
    passwords: Arc<dyn PasswordGenerator>,
    notifier: Arc<dyn PasswordNotifier>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenIssuer>,
        passwords: Arc<dyn PasswordGenerator>,
        notifier: Arc<dyn PasswordNotifier>,
    ) -> Self {
        Self {
            config,
            store,
            tokens,
            passwords,
            notifier,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub(crate) fn tokens(&self) -> &dyn TokenIssuer {
        self.tokens.as_ref()
    }

    pub(crate) fn passwords(&self) -> &dyn PasswordGenerator {
        self.passwords.as_ref()
    }

    pub(crate) fn notifier(&self) -> &dyn PasswordNotifier {
        self.notifier.as_ref()
    }
}
