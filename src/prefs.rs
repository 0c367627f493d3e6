//! Preference storage
//!
//! A small key/value store persisted as JSON in the per-user config
//! directory. A missing or unreadable store degrades to defaults; lookups
//! of absent keys yield the empty string.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

/// Key of the last-used mesh folder path
pub const LAST_FOLDER_KEY: &str = "last_folder";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Preferences {
    values: HashMap<String, String>,
}

impl Preferences {
    /// Default on-disk location: `<config dir>/vesalius/preferences.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vesalius").join("preferences.json"))
    }

    /// Loads preferences from `path`; any failure yields empty defaults.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(prefs) => prefs,
                Err(err) => {
                    warn!("preferences at {} unreadable: {err}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Value for `key`, empty string when absent.
    pub fn get(&self, key: &str) -> String {
        self.values.get(key).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Persists the store, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_key_yields_empty_string() {
        let prefs = Preferences::default();
        assert_eq!(prefs.get(LAST_FOLDER_KEY), "");
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("preferences.json");

        let mut prefs = Preferences::default();
        prefs.set(LAST_FOLDER_KEY, "/data/meshes");
        prefs.save(&path).unwrap();

        let loaded = Preferences::load(&path);
        assert_eq!(loaded.get(LAST_FOLDER_KEY), "/data/meshes");
    }

    #[test]
    fn test_missing_store_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load(&dir.path().join("nope.json"));
        assert_eq!(prefs.get(LAST_FOLDER_KEY), "");
    }

    #[test]
    fn test_corrupt_store_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "{ not json").unwrap();
        let prefs = Preferences::load(&path);
        assert_eq!(prefs.get(LAST_FOLDER_KEY), "");
    }
}
