//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{
    ARG_ADMIN_PATH, ARG_DSN, ARG_FRONTEND_URL, ARG_NOTIFY_URL, ARG_PORT,
    ARG_RESET_PASSWORD_LENGTH,
};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let frontend_url = matches
        .get_one::<String>(ARG_FRONTEND_URL)
        .cloned()
        .context("missing required argument: --frontend-url")?;
    let admin_path = matches
        .get_one::<String>(ARG_ADMIN_PATH)
        .cloned()
        .context("missing required argument: --admin-path")?;
    let notify_url = matches.get_one::<String>(ARG_NOTIFY_URL).cloned();
    let reset_password_length = matches
        .get_one::<usize>(ARG_RESET_PASSWORD_LENGTH)
        .copied()
        .unwrap_or(10);

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_url,
        admin_path,
        notify_url,
        reset_password_length,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_builds_server_action() -> Result<()> {
        temp_env::with_vars(
            [
                ("KONTO_PORT", None::<&str>),
                ("KONTO_FRONTEND_URL", None::<&str>),
                ("KONTO_ADMIN_PATH", None::<&str>),
                ("KONTO_NOTIFY_URL", None::<&str>),
                ("KONTO_RESET_PASSWORD_LENGTH", None::<&str>),
                ("KONTO_LOG_LEVEL", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "konto",
                    "--port",
                    "9090",
                    "--dsn",
                    "memory://",
                    "--admin-path",
                    "/admin/surveys/survey/",
                ]);
                let action = handler(&matches)?;
                let Action::Server(args) = action;
                assert_eq!(args.port, 9090);
                assert_eq!(args.dsn, "memory://");
                assert_eq!(args.frontend_url, "http://localhost:3000");
                assert_eq!(args.admin_path, "/admin/surveys/survey/");
                assert_eq!(args.notify_url, None);
                assert_eq!(args.reset_password_length, 10);
                Ok(())
            },
        )
    }

    #[test]
    fn handler_carries_notify_url() -> Result<()> {
        temp_env::with_vars(
            [
                ("KONTO_NOTIFY_URL", None::<&str>),
                ("KONTO_LOG_LEVEL", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "konto",
                    "--dsn",
                    "postgres://user@localhost:5432/konto",
                    "--notify-url",
                    "https://notify.example.com/send",
                ]);
                let action = handler(&matches)?;
                let Action::Server(args) = action;
                assert_eq!(
                    args.notify_url.as_deref(),
                    Some("https://notify.example.com/send")
                );
                Ok(())
            },
        )
    }
}
