//! Settings that feed `ReplicationOptions` and the scanner.
//!
//! Stored as JSON. Every field has a default, so a missing file or a file
//! with only some keys is valid.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::{ReplicationOptions, DEFAULT_CHUNK_SIZE_BYTES, DEFAULT_MAX_ENTRY_SIZE_BYTES};
use crate::scanner::DEFAULT_EXTENSIONS;

/// Application directory name under the platform config dir.
pub const APP_DIR: &str = "savemgr";

/// File name used when no explicit settings path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_entry_size_bytes: u64,
    pub skip_existing: bool,
    pub copy_source_folder_itself: bool,
    pub chunk_size_bytes: usize,
    pub progress_interval_ms: u64,
    pub scan_extensions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_entry_size_bytes: DEFAULT_MAX_ENTRY_SIZE_BYTES,
            skip_existing: true,
            copy_source_folder_itself: false,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            progress_interval_ms: 100,
            scan_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    /// `SettingsFormat` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| EngineError::SettingsFormat {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(EngineError::SettingsFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    pub fn replication_options(&self) -> ReplicationOptions {
        ReplicationOptions {
            max_entry_size_bytes: self.max_entry_size_bytes,
            copy_source_folder_itself: self.copy_source_folder_itself,
            skip_existing: self.skip_existing,
            chunk_size_bytes: self.chunk_size_bytes.max(1),
            progress_interval_ms: self.progress_interval_ms,
        }
    }
}

/// `<platform config dir>/savemgr`, when the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}
