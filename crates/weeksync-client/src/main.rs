//! weeksync CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use weeksync_client::cli::{AuthProvider, Cli, Command, ConfigAction};
use weeksync_client::config::ClientConfig;
use weeksync_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    // Load configuration
    let config = if let Some(ref path) = cli.config {
        ClientConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().map_err(ClientError::Config)?
    };

    match cli.command {
        Command::Auth { provider } => match provider {
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                weeksync_client::commands::auth::google(
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                    &config,
                )
                .await
            }
        },
        Command::Sync {
            schedule,
            credentials_file,
        } => weeksync_client::commands::sync::run(&schedule, credentials_file, &config).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => weeksync_client::commands::config::dump(&config),
            ConfigAction::Validate => weeksync_client::commands::config::validate(&config),
            ConfigAction::Path => weeksync_client::commands::config::path(),
        },
    }
}
