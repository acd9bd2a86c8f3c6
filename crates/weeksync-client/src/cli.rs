//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// weeksync - Sync a declarative weekly schedule into Google Calendar
#[derive(Debug, Parser)]
#[command(name = "weeksync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "WEEKSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// Create the schedule's recurring events in the calendar
    Sync {
        /// Path to the schedule file
        #[arg(long, default_value = "schedule.json")]
        schedule: PathBuf,

        /// Path to a Google Cloud Console credentials JSON file
        ///
        /// Falls back to `credentials.json` in the working directory
        /// when neither flags nor config.toml provide credentials.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Authenticate with Google Calendar
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to a Google Cloud Console credentials JSON file
        ///
        /// Alternative to providing client_id and client_secret
        /// separately. Falls back to `credentials.json` in the working
        /// directory when neither flags nor config.toml provide
        /// credentials.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
