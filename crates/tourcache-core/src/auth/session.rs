use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::IdentityProvider;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(user_id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name,
            created_at: Utc::now(),
        }
    }
}

/// The signed-in account, persisted across runs.
///
/// Interior mutability lets one `Session` be shared (behind an `Arc`) with the
/// sync orchestrator while the front end signs users in and out.
pub struct Session {
    cache_dir: PathBuf,
    data: RwLock<Option<SessionData>>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: RwLock::new(None),
        }
    }

    /// Load session from disk. Returns whether a session was found.
    pub fn load(&self) -> Result<bool> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(false);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = Some(data);
        Ok(true)
    }

    /// Replace the active account and persist it
    pub fn sign_in(&self, data: SessionData) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&data)?;
        std::fs::write(&path, contents).context("Failed to write session file")?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = Some(data);
        Ok(())
    }

    /// Clear session data
    pub fn clear(&self) -> Result<()> {
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn data(&self) -> Option<SessionData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Get the user ID if a session exists
    pub fn user_id(&self) -> Option<String> {
        self.data().map(|d| d.user_id)
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id().is_some()
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl IdentityProvider for Session {
    fn current_user_id(&self) -> Option<String> {
        self.user_id()
    }
}
