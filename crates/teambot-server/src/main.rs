//! Teambot entry point
//!
//! Run with:
//! ```bash
//! cargo run -p teambot-server
//! ```
//!
//! Configuration is loaded from environment variables or a `.env` file.

use anyhow::Context;
use teambot_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = ?e, "Bot failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        admins = config.admins.usernames.len(),
        "Configuration loaded"
    );

    teambot_server::run(config).await?;
    Ok(())
}
