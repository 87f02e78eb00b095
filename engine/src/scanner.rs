//! Save-file scanner.
//!
//! Walks a set of root directories looking for files whose names end with one
//! of the save-game extensions and collects the directories holding them.
//! Runs on its own background thread, independent of replication runs, and
//! reports through its own event channel.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};

use crate::cancel::{ActiveGuard, CancellationToken};
use crate::error::{EngineError, Result};
use crate::fs_ops;
use crate::progress::EventReceiver;

/// Extensions looked for when the caller does not supply any.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".sav", ".save", ".sl2", ".savegame"];

/// A progress event is emitted at least this often, in directories.
pub const PROGRESS_EVERY_DIRECTORIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Running count; `processed_count` may exceed the estimated `total_count`
    DirectoryProcessed {
        processed_count: usize,
        total_count: usize,
    },
    /// A directory could not be listed; its subtree was skipped
    DirectoryUnreadable { path: PathBuf, message: String },
    /// Terminal: matching directories, sorted by path
    ScanComplete { matched_directories: Vec<PathBuf> },
    /// Terminal: stopped between directories
    Cancelled,
}

impl ScanEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanEvent::ScanComplete { .. } | ScanEvent::Cancelled)
    }
}

pub trait ScanSink: Send {
    fn emit(&mut self, event: ScanEvent);
}

impl ScanSink for Vec<ScanEvent> {
    fn emit(&mut self, event: ScanEvent) {
        self.push(event);
    }
}

impl ScanSink for Sender<ScanEvent> {
    fn emit(&mut self, event: ScanEvent) {
        let _ = self.send(event);
    }
}

/// Outcome of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub matched_directories: BTreeSet<PathBuf>,
    pub directories_processed: usize,
    pub unreadable_directories: usize,
    pub cancelled: bool,
}

impl ScanResult {
    /// Matches in path order.
    pub fn sorted(&self) -> Vec<PathBuf> {
        self.matched_directories.iter().cloned().collect()
    }
}

/// Lowercase and dot-prefix extensions so `SAV`, `sav` and `.sav` all match `x.sav`.
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for ext in extensions
        .iter()
        .map(|ext| ext.as_ref().trim().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext != ".")
        .map(|ext| {
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        })
    {
        if !normalized.contains(&ext) {
            normalized.push(ext);
        }
    }
    normalized
}

fn matches_extension(file_name: &str, extensions: &[String]) -> bool {
    let lower = file_name.to_ascii_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
}

/// Count directories under all roots, roots included. Unreadable parts are not counted.
pub fn estimate_directory_count(roots: &[PathBuf]) -> usize {
    roots
        .iter()
        .map(|root| {
            fs_ops::walker_with_links(root, false)
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_dir())
                .count()
        })
        .sum()
}

/// Existing well-known places where games keep their saves.
pub fn default_scan_roots() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    candidates.extend(dirs::document_dir());
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join("Saved Games"));
    }
    candidates.extend(dirs::data_local_dir());
    candidates.extend(dirs::data_dir());
    if cfg!(unix) {
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".local").join("share"));
        }
    }

    let mut roots: Vec<PathBuf> = Vec::new();
    for candidate in candidates {
        if candidate.is_dir() && !roots.contains(&candidate) {
            roots.push(candidate);
        }
    }
    roots
}

/// Scan `roots` on the calling thread.
///
/// Unreadable directories are reported and skipped. Cancellation is checked
/// before each directory; a cancelled scan emits `Cancelled` instead of
/// `ScanComplete` and returns what it found so far.
pub fn scan(
    roots: &[PathBuf],
    extensions: &[String],
    sink: &mut dyn ScanSink,
    cancel: &CancellationToken,
) -> ScanResult {
    let extensions = normalize_extensions(extensions);
    let total_count = estimate_directory_count(roots);
    log::info!(
        "scanning {} roots (~{} directories) for {:?}",
        roots.len(),
        total_count,
        extensions
    );

    let mut result = ScanResult::default();

    'roots: for root in roots {
        for entry in fs_ops::walker_with_links(root, false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    log::warn!("cannot read {}: {}", path.display(), e);
                    result.unreadable_directories += 1;
                    sink.emit(ScanEvent::DirectoryUnreadable {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if cancel.is_cancelled() {
                    result.cancelled = true;
                    break 'roots;
                }
                result.directories_processed += 1;
                if result.directories_processed % PROGRESS_EVERY_DIRECTORIES == 0 {
                    sink.emit(ScanEvent::DirectoryProcessed {
                        processed_count: result.directories_processed,
                        total_count,
                    });
                }
            } else if entry.file_type().is_file() {
                let name = entry.file_name().to_string_lossy();
                if matches_extension(&name, &extensions) {
                    if let Some(parent) = entry.path().parent() {
                        if result.matched_directories.insert(parent.to_path_buf()) {
                            log::debug!("save files in {}", parent.display());
                        }
                    }
                }
            }
        }
    }

    sink.emit(ScanEvent::DirectoryProcessed {
        processed_count: result.directories_processed,
        total_count,
    });

    if result.cancelled {
        log::info!("scan cancelled after {} directories", result.directories_processed);
        sink.emit(ScanEvent::Cancelled);
    } else {
        log::info!(
            "scan complete: {} directories with save files",
            result.matched_directories.len()
        );
        sink.emit(ScanEvent::ScanComplete {
            matched_directories: result.sorted(),
        });
    }

    result
}

/// Starts save-file scans, one at a time.
#[derive(Debug, Default)]
pub struct SaveFileScanner {
    active: Arc<AtomicBool>,
}

impl SaveFileScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Start a scan on a background thread.
    ///
    /// # Errors
    /// `ScanAlreadyActive` while a previous scan runs, `WorkerSpawn` if the
    /// thread could not be created.
    pub fn start(&self, roots: Vec<PathBuf>, extensions: Vec<String>) -> Result<ScanHandle> {
        let guard = ActiveGuard::acquire(&self.active).ok_or(EngineError::ScanAlreadyActive)?;

        let (mut sender, receiver) = unbounded();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        let worker = thread::Builder::new()
            .name("save-scan".to_string())
            .spawn(move || {
                let _guard = guard;
                scan(&roots, &extensions, &mut sender, &worker_cancel)
            })
            .map_err(|e| EngineError::WorkerSpawn { source: e })?;

        Ok(ScanHandle {
            events: EventReceiver::new(receiver),
            cancel,
            worker,
        })
    }
}

/// Observer's handle on a running scan.
pub struct ScanHandle {
    events: EventReceiver<ScanEvent>,
    cancel: CancellationToken,
    worker: JoinHandle<ScanResult>,
}

impl ScanHandle {
    pub fn events(&self) -> &EventReceiver<ScanEvent> {
        &self.events
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn join(self) -> thread::Result<ScanResult> {
        self.worker.join()
    }
}
