//! Persistence of the application snapshot as a JSON file.
//!
//! The import subsystem only appends to and updates the task list inside
//! the snapshot; everything else is carried through untouched.

use shared_types::AppState;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const STATE_FILE_NAME: &str = "taskaid-state.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to serialize application state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write application state: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Storage {
    data_dir: PathBuf,
    state_path: PathBuf,
}

impl Storage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let state_path = data_dir.join(STATE_FILE_NAME);
        Storage {
            data_dir,
            state_path,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load the snapshot. A missing or unreadable file yields a fresh
    /// default state; losing a corrupt file beats refusing to start.
    pub fn load_state(&self) -> AppState {
        let content = match fs::read_to_string(&self.state_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AppState::default(),
            Err(e) => {
                tracing::warn!(
                    "Failed to read {}: {}",
                    self.state_path.display(),
                    e
                );
                return AppState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse {}: {}",
                    self.state_path.display(),
                    e
                );
                AppState::default()
            }
        }
    }

    pub fn save_state(&self, state: &AppState) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)?;
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.state_path, json)?;
        Ok(())
    }
}
