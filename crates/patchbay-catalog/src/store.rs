use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::known::KnownPlugins;
use crate::record::DescriptorRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read plugin catalog: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse plugin catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogData {
    #[serde(default)]
    plugins: Vec<DescriptorRecord>,
    #[serde(default)]
    blacklist: Vec<String>,
}

/// JSON-backed persistence for [`KnownPlugins`].
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    data: Mutex<CatalogData>,
}

impl CatalogStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            CatalogData::default()
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn default_path() -> Result<PathBuf, StoreError> {
        let mut config_dir = dirs::config_dir().ok_or_else(|| {
            StoreError::Read(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no config directory",
            ))
        })?;
        config_dir.push("Patchbay");
        fs::create_dir_all(&config_dir)?;
        config_dir.push("plugins.json");
        Ok(config_dir)
    }

    /// Rebuilds the in-memory registry, skipping records that do not carry
    /// the plugin tag so a damaged catalog loses entries instead of refusing
    /// to open.
    pub fn load(&self) -> KnownPlugins {
        let data = self.data.lock();
        let mut known = KnownPlugins::new();
        for entry in &data.blacklist {
            known.add_to_blacklist(entry.clone());
        }
        for record in &data.plugins {
            match record.clone().into_descriptor() {
                Ok(descriptor) => {
                    known.add(descriptor);
                }
                Err(err) => warn!(%err, "skipping malformed catalog record"),
            }
        }
        known
    }

    pub fn save(&self, known: &KnownPlugins) -> Result<(), StoreError> {
        let mut data = self.data.lock();
        data.plugins = known
            .plugins()
            .iter()
            .map(DescriptorRecord::from_descriptor)
            .collect();
        data.blacklist = known.blacklist().to_vec();
        let json = serde_json::to_string_pretty(&*data)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::descriptor::PluginDescriptor;

    #[test]
    fn save_and_reload_round_trips_plugins_and_blacklist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plugins.json");

        let mut known = KnownPlugins::new();
        known.add(PluginDescriptor::new("Gain", "Builtin", "builtin:gain", 7));
        known.add(PluginDescriptor::new("Tone", "Builtin", "builtin:tone", 8));
        known.add_to_blacklist("/plugins/crashy.so");

        let store = CatalogStore::open(&path).unwrap();
        store.save(&known).unwrap();

        let reopened = CatalogStore::open(&path).unwrap();
        let loaded = reopened.load();
        assert_eq!(loaded.plugins().len(), 2);
        assert!(loaded.find_matching(&known.plugins()[0].identifier_string()).is_some());
        assert!(loaded.is_blacklisted("/plugins/crashy.so"));
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempdir().unwrap();
        let store = CatalogStore::open(dir.path().join("nope.json")).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn wrong_tag_records_are_skipped_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plugins.json");
        std::fs::write(
            &path,
            r#"{
                "plugins": [
                    {"tag": "PLUGIN", "name": "Good", "uid": "7"},
                    {"tag": "FILTER", "name": "Bad", "uid": "8"}
                ],
                "blacklist": []
            }"#,
        )
        .unwrap();

        let store = CatalogStore::open(&path).unwrap();
        let known = store.load();
        assert_eq!(known.plugins().len(), 1);
        assert_eq!(known.plugins()[0].name, "Good");
    }
}
