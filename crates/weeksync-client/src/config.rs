//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/weeksync/config.toml` by default. `weeksync auth google`
//! writes the `[google]` section so later runs need no flags.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the weeksync client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Calendar settings.
    pub google: Option<GoogleSettings>,
}

/// The `[google]` section of config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID.
    pub client_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// Path of the persisted token cache. Defaults to the provider's
    /// data-dir location when unset.
    pub token_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the default (empty) configuration.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("failed to read config: {}", e))?;
            toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("weeksync")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_parses() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert!(config.google.is_none());
    }

    #[test]
    fn google_section_parses() {
        let config: ClientConfig = toml::from_str(
            r#"
            [google]
            client_id = "id.apps.googleusercontent.com"
            client_secret = "secret"
            token_path = "/tmp/tokens.json"
            "#,
        )
        .unwrap();

        let google = config.google.unwrap();
        assert_eq!(
            google.client_id.as_deref(),
            Some("id.apps.googleusercontent.com")
        );
        assert_eq!(google.client_secret.as_deref(), Some("secret"));
        assert_eq!(google.token_path, Some(PathBuf::from("/tmp/tokens.json")));
    }

    #[test]
    fn load_from_missing_file_fails() {
        assert!(ClientConfig::load_from(&PathBuf::from("/nonexistent/config.toml")).is_err());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = ClientConfig {
            google: Some(GoogleSettings {
                client_id: Some("id.apps.googleusercontent.com".to_string()),
                client_secret: Some("secret".to_string()),
                token_path: None,
            }),
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let reloaded: ClientConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(
            reloaded.google.unwrap().client_id.as_deref(),
            Some("id.apps.googleusercontent.com")
        );
    }
}
