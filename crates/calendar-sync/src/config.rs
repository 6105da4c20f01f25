use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directory the credential file lives in (watched for changes)
    #[serde(default = "default_app_dir")]
    pub app_dir: PathBuf,

    /// Directory for persisted state and the OAuth token cache
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Whether to watch the credential file for changes
    #[serde(default = "default_enable_watcher")]
    pub enable_watcher: bool,

    /// How long to wait after a credential file event before re-validating
    /// (milliseconds), letting a write-in-progress finish
    #[serde(default = "default_debounce_ms")]
    pub watcher_debounce_ms: u64,

    /// Maximum events to request per import
    #[serde(default = "default_max_events")]
    pub max_events_per_import: i32,
}

fn default_app_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_enable_watcher() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_max_events() -> i32 {
    2500
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            app_dir: default_app_dir(),
            data_dir: default_data_dir(),
            enable_watcher: default_enable_watcher(),
            watcher_debounce_ms: default_debounce_ms(),
            max_events_per_import: default_max_events(),
        }
    }
}

impl SyncConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: SyncConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Where cached OAuth tokens are kept. Wiped whenever credentials
    /// change so a new client secret always forces re-authorization.
    pub fn token_dir(&self) -> PathBuf {
        self.data_dir.join("google-oauth")
    }
}
