//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API domain, the token storage backend, and the last
//! email used to sign in.
//!
//! Configuration is stored at `~/.config/facealbum/config.json`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileTokenStore, KeyringTokenStore, SessionCookies, TokenStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "facealbum";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the API domain
pub const API_DOMAIN_ENV: &str = "FACEALBUM_API_DOMAIN";

/// Used when neither flag, environment nor config file name a domain
pub const DEFAULT_API_DOMAIN: &str = "http://localhost:5000/api";

/// Where the bearer token is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_domain: Option<String>,
    pub last_email: Option<String>,
    #[serde(default)]
    pub token_backend: TokenBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Resolve the API domain: explicit value, then environment, then the
    /// config file, then the built-in default.
    pub fn resolve_api_domain(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| std::env::var(API_DOMAIN_ENV).ok().filter(|v| !v.is_empty()))
            .or_else(|| self.api_domain.clone())
            .unwrap_or_else(|| DEFAULT_API_DOMAIN.to_string())
    }

    /// Open the configured token store.
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        match self.token_backend {
            TokenBackend::File => Ok(Arc::new(FileTokenStore::new(self.cache_dir()?))),
            TokenBackend::Keyring => Ok(Arc::new(
                KeyringTokenStore::new().context("Failed to open keychain entry")?,
            )),
        }
    }

    /// Open the session cookie jar kept in the cache directory.
    ///
    /// The refresh cookie lives here whichever token backend is configured.
    pub fn session_cookies(&self) -> Result<SessionCookies> {
        let cache_dir = self.cache_dir()?;
        SessionCookies::open(&cache_dir)
            .with_context(|| format!("Failed to load session cookies from {}", cache_dir.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.api_domain, None);
        assert_eq!(config.token_backend, TokenBackend::File);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");
        let config = Config {
            api_domain: Some("https://photos.example.com/api".to_string()),
            last_email: Some("ann@example.com".to_string()),
            token_backend: TokenBackend::Keyring,
        };
        config.save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"keyring\""));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_domain, config.api_domain);
        assert_eq!(loaded.last_email, config.last_email);
        assert_eq!(loaded.token_backend, TokenBackend::Keyring);
    }

    #[test]
    fn test_explicit_domain_wins() {
        let config = Config {
            api_domain: Some("https://from-config/api".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_api_domain(Some("https://flag/api")),
            "https://flag/api"
        );
    }
}
