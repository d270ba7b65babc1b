use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::{debug, info};

use super::Settings;
use super::error::{ConfigError, Result};

/// Settings shared across the editor.
///
/// Reads return a snapshot. Writes go through [`SettingsStore::update`],
/// which wakes subscribers only when a value actually changed.
pub struct SettingsStore {
    path: Option<PathBuf>,
    tx: watch::Sender<Settings>,
}

impl SettingsStore {
    /// A store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tx: watch::Sender::new(Settings::default()),
        }
    }

    /// Load settings from `path`. A missing file means defaults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                Settings::default()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        Ok(Self {
            path: Some(path),
            tx: watch::Sender::new(settings),
        })
    }

    /// Open the settings file in the user's config directory
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        Self::open(path)
    }

    /// `<config dir>/nextpad`
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nextpad"))
    }

    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> Settings {
        self.tx.borrow().clone()
    }

    /// Apply `change`. Returns whether anything changed.
    pub fn update(&self, change: impl FnOnce(&mut Settings)) -> bool {
        self.tx.send_if_modified(|settings| {
            let before = settings.clone();
            change(settings);
            *settings != before
        })
    }

    /// Receiver that is marked changed after every effective update
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Write the current settings back to their file
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let text = serde_json::to_string_pretty(&self.get()).map_err(|source| {
            ConfigError::Parse {
                path: path.clone(),
                source,
            }
        })?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "settings saved");
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
