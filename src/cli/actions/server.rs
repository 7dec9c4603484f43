use crate::api;
use crate::api::handlers::auth::AuthConfig;
use crate::cli::actions::Action;
use anyhow::Result;

/// Fully resolved server configuration from CLI/env.
#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_url: String,
    pub admin_path: String,
    pub notify_url: Option<String>,
    pub reset_password_length: usize,
}

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => {
            let config = AuthConfig::new(args.frontend_url)
                .with_admin_changelist_path(args.admin_path)
                .with_reset_password_length(args.reset_password_length);

            api::new(args.port, args.dsn, config, args.notify_url).await?;
        }
    }

    Ok(())
}
