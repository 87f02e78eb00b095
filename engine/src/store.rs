//! Persisted entry list.
//!
//! Entries are kept as an ordered JSON array of `{name, source, destination}`
//! objects. The store owns the live list; runs receive an owned snapshot.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::model::Entry;

/// File name used when no explicit store path is given.
pub const DEFAULT_STORE_FILE: &str = "save_folders.json";

#[derive(Debug)]
pub struct EntryStore {
    path: PathBuf,
    entries: Vec<Entry>,
}

impl EntryStore {
    /// Load the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    /// `StoreRead` if the file exists but cannot be read, `StoreFormat` if it
    /// is not a list of entries, `InvalidEntry` if a record has a blank field.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => {
                let entries: Vec<Entry> =
                    serde_json::from_str(&contents).map_err(|e| EngineError::StoreFormat {
                        path: path.clone(),
                        source: e,
                    })?;
                for entry in &entries {
                    entry.validate()?;
                }
                entries
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(EngineError::StoreRead { path, source: e }),
        };

        log::debug!("loaded {} entries from {}", entries.len(), path.display());
        Ok(EntryStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Owned copy for a run request.
    pub fn snapshot(&self) -> Vec<Entry> {
        self.entries.clone()
    }

    /// Append an entry and persist the list. On a failed save the list is left as it was.
    pub fn add(&mut self, entry: Entry) -> Result<()> {
        entry.validate()?;
        self.entries.push(entry);
        if let Err(e) = self.save() {
            self.entries.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Drop every entry and delete the persisted file.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::StoreWrite {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Write the list to disk, creating the parent directory if needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| EngineError::StoreWrite {
                    path: self.path.clone(),
                    source: e,
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            EngineError::StoreFormat {
                path: self.path.clone(),
                source: e,
            }
        })?;

        fs::write(&self.path, json).map_err(|e| EngineError::StoreWrite {
            path: self.path.clone(),
            source: e,
        })
    }
}
