//! Last-selected-list persistence.
//!
//! The one locally owned mutable resource: a per-user pointer at the last
//! active list, restored when the next session opens.  Selection is a
//! convenience rather than data, so persistence failures are logged and
//! swallowed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use tracing::warn;

use handla_shared::types::UserId;

use crate::error::{ClientError, Result};

/// Store for the per-user "last selected list" pointer.
pub trait SelectionCache: Send + Sync {
    /// The last selected storage key for `user`, if any.
    fn load(&self, user: &UserId) -> Option<String>;

    /// Persist (or clear) the selection.  Implementations log failures
    /// instead of surfacing them.
    fn store(&self, user: &UserId, key: Option<&str>);
}

/// Volatile cache for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySelectionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySelectionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionCache for MemorySelectionCache {
    fn load(&self, user: &UserId) -> Option<String> {
        self.entries.lock().ok()?.get(user.as_str()).cloned()
    }

    fn store(&self, user: &UserId, key: Option<&str>) {
        if let Ok(mut entries) = self.entries.lock() {
            match key {
                Some(key) => {
                    entries.insert(user.as_str().to_string(), key.to_string());
                }
                None => {
                    entries.remove(user.as_str());
                }
            }
        }
    }
}

/// JSON file cache in the platform data directory.
pub struct FileSelectionCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileSelectionCache {
    /// Open (or create) the default cache file:
    /// - Linux:   `~/.local/share/handla/selection.json`
    /// - macOS:   `~/Library/Application Support/app.handla.handla/selection.json`
    /// - Windows: `{FOLDERID_RoamingAppData}\handla\handla\data\selection.json`
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("app", "handla", "handla").ok_or(ClientError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        fs::create_dir_all(data_dir)?;
        Self::open_at(&data_dir.join("selection.json"))
    }

    /// Open a cache at an explicit path.
    ///
    /// Useful for tests and for embedding the cache inside custom directory
    /// layouts.
    pub fn open_at(path: &Path) -> Result<Self> {
        let entries: HashMap<String, String> = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                warn!(path = %path.display(), %error, "Resetting unreadable selection cache");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, String>) {
        match serde_json::to_string_pretty(entries) {
            Ok(json) => {
                if let Err(error) = fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), %error, "Could not persist selection");
                }
            }
            Err(error) => warn!(%error, "Could not serialize selection cache"),
        }
    }
}

impl SelectionCache for FileSelectionCache {
    fn load(&self, user: &UserId) -> Option<String> {
        self.entries.lock().ok()?.get(user.as_str()).cloned()
    }

    fn store(&self, user: &UserId, key: Option<&str>) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        match key {
            Some(key) => {
                entries.insert(user.as_str().to_string(), key.to_string());
            }
            None => {
                entries.remove(user.as_str());
            }
        }
        self.flush(&entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: &str) -> UserId {
        UserId::new(uid)
    }

    #[test]
    fn test_memory_cache_round_trip() {
        let cache = MemorySelectionCache::new();
        let u = user("abcdefghijklmnopqrst12");

        assert_eq!(cache.load(&u), None);
        cache.store(&u, Some("-0abc"));
        assert_eq!(cache.load(&u), Some("-0abc".to_string()));
        cache.store(&u, None);
        assert_eq!(cache.load(&u), None);
    }

    #[test]
    fn test_file_cache_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("selection.json");
        let u = user("abcdefghijklmnopqrst12");

        {
            let cache = FileSelectionCache::open_at(&path).expect("open");
            cache.store(&u, Some("-0abc"));
        }

        let reopened = FileSelectionCache::open_at(&path).expect("reopen");
        assert_eq!(reopened.load(&u), Some("-0abc".to_string()));
    }

    #[test]
    fn test_file_cache_resets_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("selection.json");
        fs::write(&path, "not json").expect("write");

        let cache = FileSelectionCache::open_at(&path).expect("open");
        assert_eq!(cache.load(&user("abcdefghijklmnopqrst12")), None);
    }
}
