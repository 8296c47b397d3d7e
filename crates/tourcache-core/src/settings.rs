//! Persisted sync flags.
//!
//! Stored as JSON next to the cache database (`sync_settings.json`). The
//! file is rewritten on every change; a missing file means defaults.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageResult;
use crate::mapper::codecs;

/// Settings file name in the cache directory
pub const SETTINGS_FILE: &str = "sync_settings.json";

/// Numeric value reported for "never synced".
pub const NEVER_SYNCED: i64 = 0;

/// When the last complete sync pass finished.
///
/// `Never` is a distinct state, not epoch zero: a pass that really finished at
/// `1970-01-01T00:00:00Z` is `At(0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(tag = "state", content = "millis", rename_all = "snake_case")]
pub enum LastSyncTime {
    #[default]
    Never,
    At(i64),
}

impl LastSyncTime {
    pub fn at(ts: DateTime<Utc>) -> Self {
        LastSyncTime::At(codecs::timestamp_to_millis(ts))
    }

    pub fn is_never(&self) -> bool {
        matches!(self, LastSyncTime::Never)
    }

    /// Epoch millis, with [`NEVER_SYNCED`] standing in for `Never`
    pub fn as_millis(&self) -> i64 {
        match self {
            LastSyncTime::Never => NEVER_SYNCED,
            LastSyncTime::At(millis) => *millis,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            LastSyncTime::Never => None,
            LastSyncTime::At(millis) => codecs::timestamp_from_millis(*millis),
        }
    }

    /// "never", "just now", "5m ago", "3h ago", "2d ago"
    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let Some(at) = self.as_datetime() else {
            return "never".to_string();
        };
        let minutes = (now - at).num_minutes();
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsData {
    pub offline_mode_enabled: bool,
    pub auto_sync_enabled: bool,
    pub last_sync_time: LastSyncTime,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            offline_mode_enabled: false,
            auto_sync_enabled: true,
            last_sync_time: LastSyncTime::Never,
        }
    }
}

/// Key/value sync flags backed by a JSON file.
///
/// Readers never touch the disk; writers update memory and the file under the
/// same lock, so a failed write leaves the in-memory value unchanged.
///
/// Writes are synchronous `std::fs` calls, at most one per sync pass.
pub struct SyncSettings {
    path: Option<PathBuf>,
    data: RwLock<SettingsData>,
}

impl SyncSettings {
    /// Load settings from `path`, falling back to defaults if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            SettingsData::default()
        };
        debug!(path = %path.display(), ?data, "Loaded sync settings");
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Settings in `dir`, using the standard file name
    pub fn open_in(dir: &Path) -> StorageResult<Self> {
        Self::open(dir.join(SETTINGS_FILE))
    }

    /// Settings that live only in memory
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            data: RwLock::new(SettingsData::default()),
        }
    }

    pub fn snapshot(&self) -> SettingsData {
        self.data.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_offline_mode_enabled(&self) -> bool {
        self.snapshot().offline_mode_enabled
    }

    pub fn set_offline_mode_enabled(&self, enabled: bool) -> StorageResult<()> {
        self.update(|d| d.offline_mode_enabled = enabled)
    }

    pub fn is_auto_sync_enabled(&self) -> bool {
        self.snapshot().auto_sync_enabled
    }

    pub fn set_auto_sync_enabled(&self, enabled: bool) -> StorageResult<()> {
        self.update(|d| d.auto_sync_enabled = enabled)
    }

    pub fn last_sync_time(&self) -> LastSyncTime {
        self.snapshot().last_sync_time
    }

    pub fn set_last_sync_time(&self, time: LastSyncTime) -> StorageResult<()> {
        self.update(|d| d.last_sync_time = time)
    }

    /// Back to "never synced"
    pub fn reset_last_sync_time(&self) -> StorageResult<()> {
        self.set_last_sync_time(LastSyncTime::Never)
    }

    fn update(&self, change: impl FnOnce(&mut SettingsData)) -> StorageResult<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        change(&mut next);
        if let Some(ref path) = self.path {
            Self::persist(path, &next)?;
        }
        *guard = next;
        Ok(())
    }

    fn persist(path: &Path, data: &SettingsData) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
