//! Error types for the replication engine.
//!
//! The primary error type is `EngineError`. Only start-up problems (a run
//! already in flight, a worker that could not be spawned) and store or
//! settings I/O are returned to callers as errors. Per-file copy failures and
//! unreadable directories are turned into progress events by the run itself.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the engine, the entry store and the settings loader.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Source directory does not exist
    #[error("Source directory not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    /// Source exists but is not a directory
    #[error("Source is not a directory: {}", .path.display())]
    SourceNotDirectory { path: PathBuf },

    /// Failed to read from source file
    #[error("Failed to read file: {}: {source}", .path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write to destination file
    #[error("Failed to write file: {}: {source}", .path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Source and destination resolve to the same file
    #[error("Source and destination are the same file: {}", .path.display())]
    SameFile { path: PathBuf },

    /// Failed to enumerate a source directory
    #[error("Failed to enumerate directory: {}: {source}", .path.display())]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create a directory
    #[error("Failed to create directory: {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Entry is missing its name, source or destination
    #[error("Invalid entry: {reason}")]
    InvalidEntry { reason: String },

    /// Entry store could not be read
    #[error("Failed to read entry store: {}: {source}", .path.display())]
    StoreRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Entry store could not be written or removed
    #[error("Failed to write entry store: {}: {source}", .path.display())]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Entry store contents are not a list of entries
    #[error("Malformed entry store: {}: {source}", .path.display())]
    StoreFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Settings file could not be read or parsed
    #[error("Malformed settings file: {}: {message}", .path.display())]
    SettingsFormat { path: PathBuf, message: String },

    /// A replication run is already in flight
    #[error("A replication run is already active")]
    RunAlreadyActive,

    /// A save-file scan is already in flight
    #[error("A save-file scan is already active")]
    ScanAlreadyActive,

    /// The background worker thread could not be started
    #[error("Failed to start worker thread: {source}")]
    WorkerSpawn {
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::ReadError { source, .. }
            | Self::WriteError { source, .. }
            | Self::EnumerationFailed { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::StoreRead { source, .. }
            | Self::StoreWrite { source, .. }
            | Self::WorkerSpawn { source } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
