//! Authentication commands.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

use weeksync_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};

/// Client-secret file probed when nothing else supplies credentials.
pub(crate) const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// Runs the Google authentication flow.
///
/// Credentials are resolved from CLI flags, a `--credentials-file`,
/// `config.toml`, or a `credentials.json` in the working directory, in
/// that order. Credentials arriving from a transient source are
/// persisted to `config.toml` so later runs need no flags.
pub async fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &ClientConfig,
) -> ClientResult<()> {
    let (final_client_id, final_client_secret, source) = resolve_google_credentials(
        client_id,
        client_secret,
        credentials_file,
        config.google.as_ref(),
    )?;

    let google_config =
        build_google_config(&final_client_id, &final_client_secret, config.google.as_ref())?;
    let provider = GoogleProvider::new(google_config)?;

    if provider.is_authenticated() && !force {
        save_credentials_to_config(&final_client_id, &final_client_secret, &source);
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    provider.authenticate().await?;

    save_credentials_to_config(&final_client_id, &final_client_secret, &source);

    info!("Google authentication successful");
    println!();
    println!("Authentication successful!");
    println!("Your Google Calendar tokens have been saved.");
    println!();
    println!("You can now run 'weeksync sync' to create your schedule.");

    Ok(())
}

/// Builds the provider configuration, applying `config.toml` overrides.
pub(crate) fn build_google_config(
    client_id: &str,
    client_secret: &str,
    settings: Option<&GoogleSettings>,
) -> ClientResult<GoogleConfig> {
    let credentials = OAuthCredentials::new(client_id, client_secret);
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

    let mut google_config = GoogleConfig::new(credentials);

    if let Some(settings) = settings
        && let Some(ref path) = settings.token_path
    {
        google_config = google_config.with_token_path(path);
    }

    Ok(google_config)
}

/// Where the credentials were resolved from.
#[derive(Debug, PartialEq)]
pub(crate) enum CredentialSource {
    /// From CLI flags or a credentials file.
    Cli,
    /// From config.toml (already persisted).
    Config,
}

/// Saves credentials to `config.toml` under `[google]`.
///
/// A no-op when the credentials already came from config.toml. Failures
/// here are logged, not fatal: the authentication itself succeeded.
fn save_credentials_to_config(client_id: &str, client_secret: &str, source: &CredentialSource) {
    if *source == CredentialSource::Config {
        return;
    }

    let config_path = ClientConfig::default_path();

    let content = if config_path.exists() {
        std::fs::read_to_string(&config_path).unwrap_or_default()
    } else {
        String::new()
    };

    let mut doc = match content.parse::<toml_edit::DocumentMut>() {
        Ok(d) => d,
        Err(e) => {
            info!("could not parse config.toml for writing: {}", e);
            return;
        }
    };

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    if let Some(google) = doc["google"].as_table_mut() {
        google["client_id"] = toml_edit::value(client_id);
        google["client_secret"] = toml_edit::value(client_secret);
    }

    if let Some(parent) = config_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            info!(
                "could not create config directory {}: {}",
                parent.display(),
                e
            );
            return;
        }
    }

    match std::fs::write(&config_path, doc.to_string()) {
        Ok(()) => {
            info!("credentials saved to {}", config_path.display());
            println!("Credentials saved to {}", config_path.display());
        }
        Err(e) => {
            info!(
                "could not save credentials to {}: {}",
                config_path.display(),
                e
            );
        }
    }
}

/// Resolves Google credentials from the configured sources.
///
/// Priority (highest to lowest):
/// 1. CLI `--client-id` + `--client-secret`
/// 2. CLI `--credentials-file` (Cloud Console JSON)
/// 3. `config.toml` `[google]` section
/// 4. `credentials.json` in the working directory
pub(crate) fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> ClientResult<(String, String, CredentialSource)> {
    resolve_with_default_file(
        cli_client_id,
        cli_client_secret,
        cli_credentials_file,
        config_google,
        Path::new(DEFAULT_CREDENTIALS_FILE),
    )
}

fn resolve_with_default_file(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
    default_file: &Path,
) -> ClientResult<(String, String, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        return Ok((id.clone(), secret.clone(), CredentialSource::Cli));
    }

    // Only id or only secret provided.
    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(ClientError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    if let Some(ref path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok((creds.client_id, creds.client_secret, CredentialSource::Cli));
    }

    if let Some(google) = config_google
        && let (Some(id), Some(secret)) = (&google.client_id, &google.client_secret)
    {
        return Ok((id.clone(), secret.clone(), CredentialSource::Config));
    }

    if default_file.exists() {
        let creds = OAuthCredentials::from_file(default_file).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                default_file.display(),
                e
            ))
        })?;
        return Ok((creds.client_id, creds.client_secret, CredentialSource::Cli));
    }

    let config_path = ClientConfig::default_path();
    Err(ClientError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - a credentials.json file in the working directory",
        config_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_default() -> PathBuf {
        PathBuf::from("/nonexistent/credentials.json")
    }

    fn resolve(
        id: Option<String>,
        secret: Option<String>,
        file: Option<PathBuf>,
        config: Option<&GoogleSettings>,
    ) -> ClientResult<(String, String, CredentialSource)> {
        resolve_with_default_file(id, secret, file, config, &no_default())
    }

    #[test]
    fn resolve_credentials_from_cli() {
        let (id, secret, source) = resolve(
            Some("cli-id.apps.googleusercontent.com".to_string()),
            Some("cli-secret".to_string()),
            None,
            None,
        )
        .unwrap();
        assert_eq!(id, "cli-id.apps.googleusercontent.com");
        assert_eq!(secret, "cli-secret");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn resolve_credentials_from_config() {
        let settings = GoogleSettings {
            client_id: Some("config-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("config-secret".to_string()),
            ..Default::default()
        };
        let (id, _, source) = resolve(None, None, None, Some(&settings)).unwrap();
        assert_eq!(id, "config-id.apps.googleusercontent.com");
        assert_eq!(source, CredentialSource::Config);
    }

    #[test]
    fn resolve_credentials_cli_overrides_config() {
        let settings = GoogleSettings {
            client_id: Some("config-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("config-secret".to_string()),
            ..Default::default()
        };
        let (id, _, source) = resolve(
            Some("cli-id.apps.googleusercontent.com".to_string()),
            Some("cli-secret".to_string()),
            None,
            Some(&settings),
        )
        .unwrap();
        assert_eq!(id, "cli-id.apps.googleusercontent.com");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn resolve_credentials_partial_cli_fails() {
        assert!(resolve(
            Some("id.apps.googleusercontent.com".to_string()),
            None,
            None,
            None
        )
        .is_err());
        assert!(resolve(None, Some("secret".to_string()), None, None).is_err());
    }

    #[test]
    fn resolve_credentials_no_credentials_fails() {
        assert!(resolve(None, None, None, None).is_err());
    }

    #[test]
    fn resolve_credentials_from_credentials_file() {
        let tmp = tempfile::tempdir().unwrap();
        let creds_path = tmp.path().join("creds.json");
        std::fs::write(
            &creds_path,
            r#"{
                "installed": {
                    "client_id": "file-id.apps.googleusercontent.com",
                    "client_secret": "file-secret"
                }
            }"#,
        )
        .unwrap();

        let (id, secret, source) = resolve(None, None, Some(creds_path), None).unwrap();
        assert_eq!(id, "file-id.apps.googleusercontent.com");
        assert_eq!(secret, "file-secret");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn resolve_credentials_probes_working_dir_file_last() {
        let tmp = tempfile::tempdir().unwrap();
        let default_path = tmp.path().join("credentials.json");
        std::fs::write(
            &default_path,
            r#"{"installed": {"client_id": "wd-id.apps.googleusercontent.com", "client_secret": "wd-secret"}}"#,
        )
        .unwrap();

        // Config wins over the working-directory file.
        let settings = GoogleSettings {
            client_id: Some("config-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("config-secret".to_string()),
            ..Default::default()
        };
        let (id, _, _) =
            resolve_with_default_file(None, None, None, Some(&settings), &default_path).unwrap();
        assert_eq!(id, "config-id.apps.googleusercontent.com");

        // Without config, the file is picked up.
        let (id, secret, source) =
            resolve_with_default_file(None, None, None, None, &default_path).unwrap();
        assert_eq!(id, "wd-id.apps.googleusercontent.com");
        assert_eq!(secret, "wd-secret");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn build_google_config_applies_token_path_override() {
        let settings = GoogleSettings {
            token_path: Some(PathBuf::from("/tmp/custom-tokens.json")),
            ..Default::default()
        };
        let config = build_google_config(
            "id.apps.googleusercontent.com",
            "secret",
            Some(&settings),
        )
        .unwrap();
        assert_eq!(config.token_path, PathBuf::from("/tmp/custom-tokens.json"));
    }

    #[test]
    fn build_google_config_rejects_bad_credentials() {
        assert!(build_google_config("not-a-google-id", "secret", None).is_err());
    }

    #[test]
    fn save_credentials_skips_when_source_is_config() {
        save_credentials_to_config("id", "secret", &CredentialSource::Config);
    }
}
