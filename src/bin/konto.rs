use anyhow::Result;
use konto::cli::{actions, actions::Action, start};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse arguments and initialize telemetry before doing any work.
    let action = start()?;

    match action {
        Action::Server(_) => actions::server::handle(action).await?,
    }

    Ok(())
}
