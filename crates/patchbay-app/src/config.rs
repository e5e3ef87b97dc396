use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_DIR_NAME: &str = "Patchbay";
const CONFIG_FILE: &str = "config.json";
const MAX_RECENT: usize = 10;

pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("config directory unavailable")?;
    let dir = base.join(APP_DIR_NAME);
    if !dir.exists() {
        fs::create_dir_all(&dir).context("create config directory")?;
    }
    Ok(dir)
}

/// Shell preferences persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub last_document: Option<PathBuf>,
    #[serde(default)]
    pub recent: Vec<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Self {
        let path = match config_dir() {
            Ok(dir) => dir.join(CONFIG_FILE),
            Err(_) => return Self::default(),
        };
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let dir = config_dir()?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(CONFIG_FILE), json).context("write config file")?;
        Ok(())
    }

    /// Records a document as most recently used and remembers it for the
    /// next launch. The recent list is deduplicated and capped.
    pub fn remember_document<P: AsRef<Path>>(&mut self, path: P) {
        let path = path.as_ref().to_path_buf();
        self.recent.retain(|entry| entry != &path);
        self.recent.insert(0, path.clone());
        self.recent.truncate(MAX_RECENT);
        self.last_document = Some(path);
    }
}
