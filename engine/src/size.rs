//! Directory size measurement used for admission control and progress totals.

use std::path::Path;

use crate::fs_ops;

/// Computes the total byte size of a directory subtree.
///
/// The engine takes this as a seam so admission can be exercised without
/// materializing multi-gigabyte trees.
pub trait SizeProbe: Send + Sync {
    fn size_of(&self, directory: &Path) -> u64;
}

/// Walks the real filesystem.
///
/// Regular files that disappear between listing and stat contribute zero.
/// Unreadable subdirectories and symlink loops are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSizeProbe;

impl SizeProbe for DiskSizeProbe {
    fn size_of(&self, directory: &Path) -> u64 {
        let mut total = 0u64;

        for entry in fs_ops::walker(directory) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("size probe skipping {}: {}", directory.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            // The file may be gone by now; that is not an error here.
            if let Ok(metadata) = entry.metadata() {
                total = total.saturating_add(metadata.len());
            }
        }

        total
    }
}

/// Convenience wrapper around `DiskSizeProbe`.
pub fn size_of(directory: &Path) -> u64 {
    DiskSizeProbe.size_of(directory)
}
