//! Application configuration management.
//!
//! Configuration lives at `~/.config/tourcache/config.json` and names the
//! remote store, its API token and the cache database file. The environment
//! variables `TOURCACHE_REMOTE_URL` and `TOURCACHE_API_TOKEN` take precedence
//! over the file.
//!
//! Cached data lives under `~/.cache/tourcache/`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "tourcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_DATABASE_FILE: &str = "offline.db";

pub const REMOTE_URL_ENV: &str = "TOURCACHE_REMOTE_URL";
pub const API_TOKEN_ENV: &str = "TOURCACHE_API_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub remote_url: Option<String>,
    pub api_token: Option<String>,
    pub database_file: Option<String>,
}

impl Config {
    /// Load the config file (defaults if absent) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Overlay non-empty values returned by `lookup`
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(REMOTE_URL_ENV) {
            self.remote_url = Some(url);
        }
        if let Some(token) = non_empty(API_TOKEN_ENV) {
            self.api_token = Some(token);
        }
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

    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join(self.database_file_name()))
    }

    pub fn database_file_name(&self) -> &str {
        self.database_file
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_DATABASE_FILE)
    }

    /// Remote base URL, or an error explaining how to set one
    pub fn require_remote_url(&self) -> Result<&str> {
        self.remote_url.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "No remote URL configured; set {} or add remote_url to {}",
                REMOTE_URL_ENV,
                CONFIG_FILE
            )
        })
    }
}
