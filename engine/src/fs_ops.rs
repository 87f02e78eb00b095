//! Filesystem operations module.
//!
//! This module provides low-level operations for:
//! - Walking directory trees with loop and depth protection
//! - Enumerating the files of a source tree into `FileTask`s
//! - Copying a file in chunks with cancellation checkpoints
//! - Creating directories recursively

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::cancel::CancellationToken;
use crate::error::{EngineError, Result};
use crate::model::FileTask;

/// Deepest level any tree walk descends to.
pub const MAX_WALK_DEPTH: usize = 256;

/// Depth-first walk in file-name order, following symlinks.
///
/// `walkdir` reports symlink cycles as errors instead of descending forever.
pub(crate) fn walker(root: &Path) -> walkdir::IntoIter {
    walker_with_links(root, true)
}

pub(crate) fn walker_with_links(root: &Path, follow_links: bool) -> walkdir::IntoIter {
    WalkDir::new(root)
        .follow_links(follow_links)
        .max_depth(MAX_WALK_DEPTH)
        .sort_by_file_name()
        .into_iter()
}

/// Convert a walk error into an `EnumerationFailed`, keeping the OS error when there is one.
pub(crate) fn walk_error(err: walkdir::Error, fallback: &Path) -> EngineError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf());
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message));
    EngineError::EnumerationFailed { path, source }
}

/// Everything found under a source directory at job start.
#[derive(Debug, Default)]
pub struct TreeListing {
    /// Subdirectories, relative to the source root, parents before children
    pub directories: Vec<PathBuf>,
    /// Regular files in walk order
    pub files: Vec<FileTask>,
    /// Subtrees that could not be read; their contents are absent from `files`
    pub errors: Vec<EngineError>,
}

impl TreeListing {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// Enumerate the source directory tree.
///
/// # Arguments
/// * `source` - Source directory to enumerate
/// * `destination_root` - Where the relative paths are re-rooted
///
/// # Errors
/// Returns EngineError only if the source root itself is missing or not a
/// directory. Failures below the root are collected in `TreeListing::errors`.
pub fn enumerate_tree(source: &Path, destination_root: &Path) -> Result<TreeListing> {
    match fs::metadata(source) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            return Err(EngineError::SourceNotDirectory {
                path: source.to_path_buf(),
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(EngineError::SourceNotFound {
                path: source.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(EngineError::EnumerationFailed {
                path: source.to_path_buf(),
                source: e,
            })
        }
    }

    let mut listing = TreeListing::default();

    for entry in walker(source) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if e.depth() == 0 {
                    return Err(walk_error(e, source));
                }
                listing.errors.push(walk_error(e, source));
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let relative_path = match entry.path().strip_prefix(source) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };

        if entry.file_type().is_dir() {
            listing.directories.push(relative_path);
        } else if entry.file_type().is_file() {
            let size_bytes = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    log::debug!("{} vanished during listing: {}", entry.path().display(), e);
                    continue;
                }
            };
            listing.files.push(FileTask {
                absolute_destination_path: destination_root.join(&relative_path),
                absolute_source_path: entry.path().to_path_buf(),
                relative_path,
                size_bytes,
            });
        }
    }

    Ok(listing)
}

/// Result of a chunked copy that did not hit an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkedCopy {
    /// All content was written
    Finished { bytes: u64 },
    /// Cancellation was observed between chunks; the destination is partial
    Interrupted { bytes: u64 },
}

/// Copy a file in fixed-size chunks, preserving its modification time.
///
/// `on_chunk` receives the size of every chunk written. Cancellation is
/// checked before each read.
///
/// # Errors
/// Returns `ReadError`/`WriteError`/`DirectoryCreationFailed` on I/O failure,
/// and `SameFile` when `dst` is `src` itself.
/// Bytes already reported through `on_chunk` stay written.
pub fn copy_file_chunked(
    src: &Path,
    dst: &Path,
    chunk_size: usize,
    cancel: &CancellationToken,
    on_chunk: &mut dyn FnMut(u64),
) -> Result<ChunkedCopy> {
    let mut src_file = fs::File::open(src).map_err(|e| EngineError::ReadError {
        path: src.to_path_buf(),
        source: e,
    })?;

    let src_mtime = src_file.metadata().and_then(|m| m.modified()).ok();

    // Creating the destination would truncate the source.
    if let Ok(true) = same_file::is_same_file(src, dst) {
        return Err(EngineError::SameFile {
            path: dst.to_path_buf(),
        });
    }

    ensure_parent_dir_exists(dst)?;

    let mut dst_file = fs::File::create(dst).map_err(|e| EngineError::WriteError {
        path: dst.to_path_buf(),
        source: e,
    })?;

    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut copied = 0u64;

    loop {
        if cancel.is_cancelled() {
            return Ok(ChunkedCopy::Interrupted { bytes: copied });
        }

        let read = match src_file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(EngineError::ReadError {
                    path: src.to_path_buf(),
                    source: e,
                })
            }
        };

        dst_file
            .write_all(&buffer[..read])
            .map_err(|e| EngineError::WriteError {
                path: dst.to_path_buf(),
                source: e,
            })?;

        copied += read as u64;
        on_chunk(read as u64);
    }

    dst_file.flush().map_err(|e| EngineError::WriteError {
        path: dst.to_path_buf(),
        source: e,
    })?;
    drop(dst_file);

    if let Some(mtime) = src_mtime {
        if let Err(e) = filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime)) {
            log::debug!("could not preserve mtime on {}: {}", dst.display(), e);
        }
    }

    Ok(ChunkedCopy::Finished { bytes: copied })
}

/// Create a directory and its parents if missing.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| EngineError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Ensure the parent directory of a path exists, creating it if necessary.
///
/// # Errors
/// Returns EngineError if the parent exists as a file or cannot be created.
pub fn ensure_parent_dir_exists(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return Ok(()),
    };

    match fs::metadata(parent) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(EngineError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                "Parent path exists but is not a directory",
            ),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => ensure_dir(parent),
        Err(e) => Err(EngineError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: e,
        }),
    }
}
