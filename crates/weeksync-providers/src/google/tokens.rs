//! OAuth token persistence.
//!
//! Tokens are cached as JSON so later runs can skip the interactive
//! consent flow. A corrupt or unreadable cache is reported to the caller
//! rather than silently discarded: the operator decides whether to
//! delete the file and re-authenticate.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// An OAuth token set obtained from the authorization or refresh flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// When the tokens were last obtained or refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Creates a token set from OAuth response data.
    ///
    /// The expiry carries a one-minute buffer so a refresh happens before
    /// the token actually lapses mid-request.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(Self::expiry_from_now),
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            // No expiry recorded: assume still valid.
            None => false,
        }
    }

    /// Replaces the access token after a refresh.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(Self::expiry_from_now);
        self.last_refresh = Utc::now();
    }

    fn expiry_from_now(secs: i64) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(secs) - Duration::seconds(60)
    }
}

/// File-backed token storage.
///
/// Writes go to a temp file first and are renamed into place; on Unix the
/// file is restricted to the owner.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    /// Creates a token storage backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    /// Loads tokens from disk into memory.
    ///
    /// Returns `Ok(true)` if tokens were loaded, `Ok(false)` if no cache
    /// file exists. An unreadable or unparsable cache is an error.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read token file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "corrupt token file {} (delete it and re-authenticate): {}",
                self.path.display(),
                e
            ))
        })?;

        info!("loaded tokens from {:?}", self.path);
        *self.tokens.write().unwrap() = Some(tokens);
        Ok(true)
    }

    /// Saves the current tokens to disk.
    pub fn save(&self) -> ProviderResult<()> {
        let tokens = self.tokens.read().unwrap();
        let tokens = tokens
            .as_ref()
            .ok_or_else(|| ProviderError::internal("no tokens to save"))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }

    /// Returns a clone of the current tokens, if any.
    pub fn get(&self) -> Option<TokenInfo> {
        self.tokens.read().unwrap().clone()
    }

    /// Sets new tokens and persists them.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        *self.tokens.write().unwrap() = Some(tokens);
        self.save()
    }

    /// Updates the access token after a refresh and persists.
    pub fn update_access_token(
        &self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) -> ProviderResult<()> {
        let mut tokens = self.tokens.write().unwrap();
        if let Some(ref mut t) = *tokens {
            t.update_access_token(access_token, expires_in_secs);
            drop(tokens);
            self.save()
        } else {
            Err(ProviderError::internal("no tokens to update"))
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> (tempfile::TempDir, TokenStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("tokens.json"));
        (dir, storage)
    }

    #[test]
    fn token_info_creation() {
        let token = TokenInfo::new("access-token", Some("refresh-token".to_string()), Some(3600));
        assert_eq!(token.access_token, "access-token");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-token"));
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());
    }

    #[test]
    fn token_info_expiry() {
        let mut token = TokenInfo::new("access", None, Some(3600));
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());

        // Without a recorded expiry the token counts as valid.
        let token = TokenInfo::new("access", None, None);
        assert!(!token.is_expired());
    }

    #[test]
    fn token_info_update_after_refresh() {
        let mut token = TokenInfo::new("old", Some("refresh".to_string()), Some(10));
        token.update_access_token("new", Some(3600));
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
        assert!(!token.is_expired());
    }

    #[test]
    fn storage_save_and_load() {
        let (_dir, storage) = temp_storage();
        storage
            .set(TokenInfo::new("access", Some("refresh".to_string()), Some(3600)))
            .unwrap();
        assert!(storage.path().exists());

        let storage2 = TokenStorage::new(storage.path());
        assert!(storage2.load().unwrap());
        assert_eq!(storage2.get().unwrap().access_token, "access");
    }

    #[test]
    fn storage_load_without_file() {
        let (_dir, storage) = temp_storage();
        assert!(!storage.load().unwrap());
        assert!(storage.get().is_none());
    }

    #[test]
    fn storage_corrupt_file_is_an_error() {
        let (_dir, storage) = temp_storage();
        fs::write(storage.path(), "{ not json").unwrap();
        let err = storage.load().unwrap_err();
        assert!(err.to_string().contains("corrupt token file"));
    }

    #[test]
    fn storage_update_requires_tokens() {
        let (_dir, storage) = temp_storage();
        assert!(storage.update_access_token("new", Some(3600)).is_err());

        storage.set(TokenInfo::new("old", None, Some(10))).unwrap();
        storage.update_access_token("new", Some(3600)).unwrap();
        assert_eq!(storage.get().unwrap().access_token, "new");
    }
}
