//! Trellis users service: auth, users and roles routes in one process

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use trellis_auth_core::Secrets;
use trellis_infra_common::{log_welcome, setup_logging};
use trellis_users_core::{create_router, init, seed_users, ServiceConfig};

const APP_NAME: &str = "trellis-users";

#[derive(Parser, Debug)]
#[command(name = "trellis-users")]
#[command(about = "Trellis users, auth and roles service")]
struct Args {
    /// TOML configuration file; environment variables override it
    #[arg(short, long)]
    config: Option<String>,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServiceConfig::load(args.config.as_deref()).context("Invalid configuration")?;

    let logging = config.logging.to_logging_config(APP_NAME)?;
    setup_logging(&logging)?;
    log_welcome(APP_NAME, env!("CARGO_PKG_VERSION"));

    let secrets = Secrets::load(&config.secrets).context("Unable to load secrets")?;
    let state = init(&config, &secrets)?;

    let seeded = seed_users(&state, &config.seed_users).await;
    if seeded > 0 {
        info!("Registered {} seed user(s)", seeded);
    }

    let address = config.bind_address()?;
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Unable to bind {}", address))?;
    info!("Listening on {}", address);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
