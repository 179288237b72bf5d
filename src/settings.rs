use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::application::services::{BirthdayScan, SearchMode, ServiceConfig};

/// Default filename used to persist configuration within the data directory.
const CONFIG_FILENAME: &str = "config.json";

/// Which contact store backs the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum StoreBackend {
    /// Embedded sled database under `<data_dir>/<path>`.
    Sled {
        #[serde(default = "default_store_path")]
        path: String,
    },
    /// Process memory only; contents vanish on exit.
    Memory,
}

impl StoreBackend {
    pub fn id(&self) -> &'static str {
        match self {
            StoreBackend::Sled { .. } => "sled",
            StoreBackend::Memory => "memory",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StoreBackend::Sled { .. } => "Persistent embedded database (sled).",
            StoreBackend::Memory => "Ephemeral in-process store, handy for trials and tests.",
        }
    }

    pub fn with_default_settings(id: &str) -> Option<Self> {
        match id {
            "sled" => Some(StoreBackend::Sled {
                path: default_store_path(),
            }),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::Sled {
            path: default_store_path(),
        }
    }
}

/// Settings for the upcoming-birthdays query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BirthdaySettings {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default)]
    pub scan: BirthdayScan,
}

impl Default for BirthdaySettings {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            scan: BirthdayScan::default(),
        }
    }
}

/// Complete persisted configuration payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreBackend,
    #[serde(default)]
    pub search: SearchMode,
    #[serde(default)]
    pub birthdays: BirthdaySettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::default(),
            search: SearchMode::default(),
            birthdays: BirthdaySettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::default()
            .with_search_mode(self.search)
            .with_birthday_scan(self.birthdays.scan)
            .with_horizon_days(self.birthdays.horizon_days)
    }
}

/// Thread-safe manager responsible for loading and persisting `AppConfig`.
pub struct ConfigManager {
    path: PathBuf,
    state: RwLock<AppConfig>,
}

impl ConfigManager {
    /// Create a manager rooted at `data_dir`. The JSON file will be located at
    /// `<data_dir>/config.json`. A missing or unreadable file yields defaults.
    pub fn load(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILENAME);
        let config = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice::<AppConfig>(&bytes).unwrap_or_else(|err| {
                warn!(
                    target: "contacts::settings",
                    path = %path.display(),
                    "ignoring malformed config: {err}"
                );
                AppConfig::default()
            })
        } else {
            AppConfig::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> AppConfig {
        self.state.read().clone()
    }

    /// Update the search mode and persist to disk.
    pub fn set_search_mode(&self, mode: SearchMode) -> std::io::Result<AppConfig> {
        self.update(|config| config.search = mode)
    }

    /// Update the birthday query settings and persist to disk.
    pub fn set_birthdays(&self, birthdays: BirthdaySettings) -> std::io::Result<AppConfig> {
        self.update(|config| config.birthdays = birthdays)
    }

    /// Switch the store backend and persist to disk. Takes effect on the
    /// next bootstrap.
    pub fn set_store(&self, store: StoreBackend) -> std::io::Result<AppConfig> {
        self.update(|config| config.store = store)
    }

    fn update(&self, apply: impl FnOnce(&mut AppConfig)) -> std::io::Result<AppConfig> {
        let mut guard = self.state.write();
        apply(&mut guard);
        self.persist_locked(&guard)?;
        Ok(guard.clone())
    }

    /// Ensure the backing directory exists and write the JSON payload.
    fn persist_locked(&self, config: &AppConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(config)?;
        fs::write(&self.path, payload)
    }
}

const fn default_horizon_days() -> u32 {
    7
}

fn default_store_path() -> String {
    "store".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
