//! Configuration commands.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

use weeksync_providers::google::OAuthCredentials;

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", ClientConfig::default_path().display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    if let Some(ref google) = config.google
        && let (Some(id), Some(secret)) = (&google.client_id, &google.client_secret)
    {
        OAuthCredentials::new(id, secret)
            .validate()
            .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;
        println!("Google credentials are valid.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ClientResult<()> {
    println!("config: {}", ClientConfig::default_path().display());
    Ok(())
}
