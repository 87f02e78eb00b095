//! Core data model for replication runs.
//!
//! This module defines the main data structures:
//! - Entry: a named source/destination pair registered by the user
//! - ReplicationOptions / ReplicationRequest: the immutable input of one run
//! - JobPlan / FileTask: the work derived from an admitted entry
//! - JobReport / RunSummary: what a job and a run produced

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// Default admission cap: 5 GiB.
pub const DEFAULT_MAX_ENTRY_SIZE_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Default copy chunk: 1 MiB.
pub const DEFAULT_CHUNK_SIZE_BYTES: usize = 1024 * 1024;

/// A named pair of source and destination directories.
///
/// Names are not required to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl Entry {
    /// Build an entry from all three parts at once.
    ///
    /// # Errors
    /// Returns `InvalidEntry` if the name or either path is empty.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Result<Self> {
        let entry = Entry {
            name: name.into(),
            source: source.into(),
            destination: destination.into(),
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check that no field is blank. Entries loaded from disk go through this too.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::InvalidEntry {
                reason: "name is empty".to_string(),
            });
        }
        if self.source.as_os_str().is_empty() {
            return Err(EngineError::InvalidEntry {
                reason: format!("source for '{}' is empty", self.name),
            });
        }
        if self.destination.as_os_str().is_empty() {
            return Err(EngineError::InvalidEntry {
                reason: format!("destination for '{}' is empty", self.name),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.name,
            self.source.display(),
            self.destination.display()
        )
    }
}

/// Per-run behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationOptions {
    /// Entries whose source tree is larger than this are not copied
    pub max_entry_size_bytes: u64,
    /// Copy into `destination/<source name>` instead of `destination`
    pub copy_source_folder_itself: bool,
    /// Leave existing destination files untouched
    pub skip_existing: bool,
    /// Read/write buffer size; cancellation is checked between chunks
    pub chunk_size_bytes: usize,
    /// Minimum spacing between two byte-count events, in milliseconds
    pub progress_interval_ms: u64,
}

impl Default for ReplicationOptions {
    fn default() -> Self {
        ReplicationOptions {
            max_entry_size_bytes: DEFAULT_MAX_ENTRY_SIZE_BYTES,
            copy_source_folder_itself: false,
            skip_existing: true,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            progress_interval_ms: 100,
        }
    }
}

/// Immutable snapshot handed to the engine when a run starts.
///
/// The entry list is copied in, so later edits to the caller's list do not
/// reach an in-flight run.
#[derive(Debug, Clone)]
pub struct ReplicationRequest {
    entries: Vec<Entry>,
    options: ReplicationOptions,
}

impl ReplicationRequest {
    pub fn new(entries: &[Entry], options: ReplicationOptions) -> Self {
        ReplicationRequest {
            entries: entries.to_vec(),
            options,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn options(&self) -> &ReplicationOptions {
        &self.options
    }
}

/// One admitted entry, ready to run.
#[derive(Debug, Clone)]
pub struct JobPlan {
    pub entry_name: String,
    pub source: PathBuf,
    pub destination_root: PathBuf,
    /// Size measured at admission time
    pub precomputed_size_bytes: u64,
}

impl JobPlan {
    /// Resolve where files land for this entry.
    pub fn from_entry(entry: &Entry, size: u64, options: &ReplicationOptions) -> Self {
        let destination_root = if options.copy_source_folder_itself {
            nested_destination(&entry.source, &entry.destination)
        } else {
            entry.destination.clone()
        };

        JobPlan {
            entry_name: entry.name.clone(),
            source: entry.source.clone(),
            destination_root,
            precomputed_size_bytes: size,
        }
    }
}

/// `destination/basename(source)`, or `destination` when the source has no
/// final component (a filesystem root).
fn nested_destination(source: &Path, destination: &Path) -> PathBuf {
    match source.file_name() {
        Some(name) => destination.join(name),
        None => destination.to_path_buf(),
    }
}

/// A single regular file to copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub relative_path: PathBuf,
    pub absolute_source_path: PathBuf,
    pub absolute_destination_path: PathBuf,
    pub size_bytes: u64,
}

/// Counters for one finished (or interrupted) job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub files_copied: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    /// Unreadable source directories and destination directories that could not be created
    pub directories_failed: usize,
    pub bytes_copied: u64,
    pub cancelled: bool,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every admitted job ran to the end
    Completed,
    /// Stopped at a checkpoint after a cancel request
    Cancelled,
    /// No entry passed admission; nothing was started
    NothingToCopy,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "Completed"),
            RunOutcome::Cancelled => write!(f, "Cancelled"),
            RunOutcome::NothingToCopy => write!(f, "Nothing to copy"),
        }
    }
}

/// Final account of a replication run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entries_admitted: usize,
    pub entries_rejected: usize,
    pub files_copied: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub directories_failed: usize,
    pub total_bytes: u64,
    pub bytes_copied: u64,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.files_failed > 0 || self.directories_failed > 0
    }
}
