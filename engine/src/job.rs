//! Copy job execution.
//!
//! A copy job replicates one admitted entry: it lists the source tree once,
//! then copies file by file in walk order. Per-file errors are reported and
//! the job moves on; only cancellation ends a job early.

use crate::cancel::CancellationToken;
use crate::fs_ops::{self, ChunkedCopy};
use crate::model::{FileTask, JobPlan, JobReport, ReplicationOptions};
use crate::progress::{ProgressEvent, ProgressSink};

/// Byte accounting shared by all jobs of one run.
///
/// Invariant: `cumulative_bytes <= total_bytes` after every emitted event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub total_bytes: u64,
    pub cumulative_bytes: u64,
}

impl RunTally {
    pub fn new(total_bytes: u64) -> Self {
        RunTally {
            total_bytes,
            cumulative_bytes: 0,
        }
    }

    /// Lower the total, never below what was already copied.
    fn shrink(&mut self, bytes: u64, sink: &mut dyn ProgressSink) {
        let new_total = self
            .total_bytes
            .saturating_sub(bytes)
            .max(self.cumulative_bytes);
        if new_total == self.total_bytes {
            return;
        }
        self.total_bytes = new_total;
        sink.emit(ProgressEvent::TotalAdjusted {
            new_total_bytes: self.total_bytes,
        });
    }

    fn grow(&mut self, bytes: u64, sink: &mut dyn ProgressSink) {
        if bytes == 0 {
            return;
        }
        self.total_bytes = self.total_bytes.saturating_add(bytes);
        sink.emit(ProgressEvent::TotalAdjusted {
            new_total_bytes: self.total_bytes,
        });
    }

    fn record_chunk(&mut self, bytes: u64, sink: &mut dyn ProgressSink) {
        self.cumulative_bytes += bytes;
        if self.cumulative_bytes > self.total_bytes {
            // The file grew after it was listed.
            let excess = self.cumulative_bytes - self.total_bytes;
            self.grow(excess, sink);
        }
        sink.emit(ProgressEvent::BytesCopied {
            cumulative_bytes: self.cumulative_bytes,
        });
    }
}

/// Copies one source tree to one destination root.
pub struct CopyJob<'a> {
    plan: &'a JobPlan,
    options: &'a ReplicationOptions,
    cancel: &'a CancellationToken,
}

impl<'a> CopyJob<'a> {
    pub fn new(
        plan: &'a JobPlan,
        options: &'a ReplicationOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        CopyJob {
            plan,
            options,
            cancel,
        }
    }

    /// Run the job to its end or to the first cancellation checkpoint.
    ///
    /// `tally.total_bytes` must already include `plan.precomputed_size_bytes`.
    pub fn run(&self, tally: &mut RunTally, sink: &mut dyn ProgressSink) -> JobReport {
        let plan = self.plan;
        let mut report = JobReport::default();

        // List before creating anything, so a destination inside the source is not listed.
        let listing = match fs_ops::enumerate_tree(&plan.source, &plan.destination_root) {
            Ok(listing) => listing,
            Err(e) => {
                self.fail(&e.to_string(), sink);
                tally.shrink(plan.precomputed_size_bytes, sink);
                report.files_failed += 1;
                return report;
            }
        };

        if self.options.copy_source_folder_itself {
            if let Err(e) = fs_ops::ensure_dir(&plan.destination_root) {
                self.fail(&e.to_string(), sink);
                tally.shrink(plan.precomputed_size_bytes, sink);
                report.files_failed += 1;
                return report;
            }
        }

        for error in &listing.errors {
            self.fail(&error.to_string(), sink);
            report.directories_failed += 1;
        }

        let listed_bytes = listing.total_bytes();
        if listed_bytes < plan.precomputed_size_bytes {
            tally.shrink(plan.precomputed_size_bytes - listed_bytes, sink);
        } else {
            tally.grow(listed_bytes - plan.precomputed_size_bytes, sink);
        }

        log::debug!(
            "job '{}': {} files, {} bytes -> {}",
            plan.entry_name,
            listing.files.len(),
            listed_bytes,
            plan.destination_root.display()
        );
        sink.emit(ProgressEvent::JobStarted {
            entry_name: plan.entry_name.clone(),
            destination_root: plan.destination_root.clone(),
            file_count: listing.files.len(),
        });

        for task in &listing.files {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                return report;
            }

            if self.options.skip_existing && task.absolute_destination_path.exists() {
                log::debug!("skipping existing {}", task.absolute_destination_path.display());
                sink.emit(ProgressEvent::FileSkipped {
                    relative_path: task.relative_path.clone(),
                });
                tally.shrink(task.size_bytes, sink);
                report.files_skipped += 1;
                continue;
            }

            if self.copy_one(task, tally, sink, &mut report) {
                report.cancelled = true;
                return report;
            }
        }

        // Directories that held no files still need to exist.
        for relative in &listing.directories {
            if let Err(e) = fs_ops::ensure_dir(&plan.destination_root.join(relative)) {
                self.fail(&e.to_string(), sink);
                report.directories_failed += 1;
            }
        }

        sink.emit(ProgressEvent::JobFinished {
            entry_name: plan.entry_name.clone(),
            files_copied: report.files_copied,
            files_skipped: report.files_skipped,
            files_failed: report.files_failed,
        });

        report
    }

    /// Copy a single file. Returns true if cancellation interrupted it.
    fn copy_one(
        &self,
        task: &FileTask,
        tally: &mut RunTally,
        sink: &mut dyn ProgressSink,
        report: &mut JobReport,
    ) -> bool {
        let mut file_bytes = 0u64;
        let result = fs_ops::copy_file_chunked(
            &task.absolute_source_path,
            &task.absolute_destination_path,
            self.options.chunk_size_bytes,
            self.cancel,
            &mut |n| {
                file_bytes += n;
                tally.record_chunk(n, sink);
            },
        );

        match result {
            Ok(ChunkedCopy::Finished { bytes }) => {
                if bytes < task.size_bytes {
                    tally.shrink(task.size_bytes - bytes, sink);
                }
                sink.emit(ProgressEvent::FileCopied {
                    relative_path: task.relative_path.clone(),
                });
                report.files_copied += 1;
                report.bytes_copied += bytes;
                false
            }
            Ok(ChunkedCopy::Interrupted { bytes }) => {
                log::debug!(
                    "cancelled while copying {} ({} bytes written)",
                    task.relative_path.display(),
                    bytes
                );
                report.bytes_copied += bytes;
                true
            }
            Err(e) => {
                self.fail(&e.to_string(), sink);
                tally.shrink(task.size_bytes.saturating_sub(file_bytes), sink);
                report.files_failed += 1;
                report.bytes_copied += file_bytes;
                false
            }
        }
    }

    fn fail(&self, message: &str, sink: &mut dyn ProgressSink) {
        log::warn!("error copying '{}': {}", self.plan.entry_name, message);
        sink.emit(ProgressEvent::JobFailed {
            entry_name: self.plan.entry_name.clone(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entry;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn make_source(root: &Path) -> PathBuf {
        let src = root.join("src");
        fs::create_dir_all(src.join("sub")).expect("Failed to create src dirs");
        fs::write(src.join("a.txt"), vec![b'a'; 10]).expect("Failed to write a.txt");
        fs::write(src.join("sub/b.txt"), vec![b'b'; 20]).expect("Failed to write b.txt");
        src
    }

    fn run(
        src: &Path,
        dst: &Path,
        options: &ReplicationOptions,
        cancel: &CancellationToken,
    ) -> (JobReport, RunTally, Vec<ProgressEvent>) {
        let mut events = Vec::new();
        let (report, tally) = run_with(src, dst, 30, options, cancel, &mut events);
        (report, tally, events)
    }

    fn run_with(
        src: &Path,
        dst: &Path,
        estimate: u64,
        options: &ReplicationOptions,
        cancel: &CancellationToken,
        sink: &mut dyn ProgressSink,
    ) -> (JobReport, RunTally) {
        let entry = Entry::new("game", src, dst).expect("valid entry");
        let plan = JobPlan::from_entry(&entry, estimate, options);
        let mut tally = RunTally::new(estimate);
        let report = CopyJob::new(&plan, options, cancel).run(&mut tally, sink);
        (report, tally)
    }

    /// Runs `action` once, right after the first chunk of the run is reported.
    struct AfterFirstChunk<F: FnMut() + Send> {
        action: Option<F>,
        events: Vec<ProgressEvent>,
    }

    impl<F: FnMut() + Send> AfterFirstChunk<F> {
        fn new(action: F) -> Self {
            AfterFirstChunk {
                action: Some(action),
                events: Vec::new(),
            }
        }
    }

    impl<F: FnMut() + Send> ProgressSink for AfterFirstChunk<F> {
        fn emit(&mut self, event: ProgressEvent) {
            let first_chunk = matches!(event, ProgressEvent::BytesCopied { .. });
            self.events.push(event);
            if first_chunk {
                if let Some(mut action) = self.action.take() {
                    action();
                }
            }
        }
    }

    /// Replays events and checks that the copied count never passes the total.
    fn assert_bounded(events: &[ProgressEvent], initial_total: u64) {
        let mut total = initial_total;
        let mut cumulative = 0;
        for event in events {
            match event {
                ProgressEvent::TotalAdjusted { new_total_bytes } => total = *new_total_bytes,
                ProgressEvent::BytesCopied { cumulative_bytes } => cumulative = *cumulative_bytes,
                _ => {}
            }
            assert!(
                cumulative <= total,
                "copied {} of {} after {:?}",
                cumulative,
                total,
                event
            );
        }
    }

    fn single_file_source(root: &Path, len: usize) -> PathBuf {
        let src = root.join("src");
        fs::create_dir_all(&src).expect("Failed to create src");
        fs::write(src.join("a.txt"), vec![b'a'; len]).expect("Failed to write a.txt");
        src
    }

    fn copied_paths(events: &[ProgressEvent]) -> Vec<PathBuf> {
        events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::FileCopied { relative_path } => Some(relative_path.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_run_job_copies_tree() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        let dst = temp_dir.path().join("dst");
        let options = ReplicationOptions {
            skip_existing: false,
            chunk_size_bytes: 8,
            ..ReplicationOptions::default()
        };

        let (report, tally, events) = run(&src, &dst, &options, &CancellationToken::new());

        assert_eq!(report.files_copied, 2);
        assert_eq!(report.bytes_copied, 30);
        assert!(!report.cancelled);
        assert_eq!(tally, RunTally { total_bytes: 30, cumulative_bytes: 30 });
        assert_eq!(
            copied_paths(&events),
            vec![PathBuf::from("a.txt"), PathBuf::from("sub/b.txt")]
        );
        assert_eq!(fs::read(dst.join("a.txt")).expect("read a"), vec![b'a'; 10]);
        assert_eq!(fs::read(dst.join("sub/b.txt")).expect("read b"), vec![b'b'; 20]);
    }

    #[test]
    fn test_byte_counts_are_monotonic_and_bounded() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        let dst = temp_dir.path().join("dst");
        let options = ReplicationOptions {
            chunk_size_bytes: 3,
            ..ReplicationOptions::default()
        };

        let (_, _, events) = run(&src, &dst, &options, &CancellationToken::new());

        let mut total = 30;
        let mut last = 0;
        for event in &events {
            match event {
                ProgressEvent::TotalAdjusted { new_total_bytes } => total = *new_total_bytes,
                ProgressEvent::BytesCopied { cumulative_bytes } => {
                    assert!(*cumulative_bytes >= last);
                    assert!(*cumulative_bytes <= total);
                    last = *cumulative_bytes;
                }
                _ => {}
            }
        }
        assert_eq!(last, 30);
    }

    #[test]
    fn test_skip_existing_leaves_destination_untouched() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(&dst).expect("Failed to create dst");
        fs::write(dst.join("a.txt"), b"existing").expect("Failed to write existing");

        let (report, tally, events) = run(
            &src,
            &dst,
            &ReplicationOptions::default(),
            &CancellationToken::new(),
        );

        assert_eq!(fs::read(dst.join("a.txt")).expect("read a"), b"existing");
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.files_copied, 1);
        assert!(events.contains(&ProgressEvent::FileSkipped {
            relative_path: PathBuf::from("a.txt")
        }));
        assert!(events.contains(&ProgressEvent::TotalAdjusted { new_total_bytes: 20 }));
        assert_eq!(tally, RunTally { total_bytes: 20, cumulative_bytes: 20 });
    }

    #[test]
    fn test_overwrite_when_skip_disabled() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(&dst).expect("Failed to create dst");
        fs::write(dst.join("a.txt"), b"old").expect("Failed to write existing");

        let options = ReplicationOptions {
            skip_existing: false,
            ..ReplicationOptions::default()
        };
        let (report, _, _) = run(&src, &dst, &options, &CancellationToken::new());

        assert_eq!(report.files_copied, 2);
        assert_eq!(fs::read(dst.join("a.txt")).expect("read a"), vec![b'a'; 10]);
    }

    #[test]
    fn test_copy_source_folder_itself() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        fs::create_dir(src.join("empty")).expect("Failed to create empty dir");
        let dst = temp_dir.path().join("dst");
        let options = ReplicationOptions {
            copy_source_folder_itself: true,
            ..ReplicationOptions::default()
        };

        let (report, _, _) = run(&src, &dst, &options, &CancellationToken::new());

        assert_eq!(report.files_copied, 2);
        assert!(dst.join("src/a.txt").is_file());
        assert!(dst.join("src/sub/b.txt").is_file());
        assert!(dst.join("src/empty").is_dir());
    }

    #[test]
    fn test_file_failure_does_not_stop_job() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(&dst).expect("Failed to create dst");
        // A file where a directory is needed makes sub/b.txt uncopyable.
        fs::write(dst.join("sub"), b"blocker").expect("Failed to write blocker");

        let options = ReplicationOptions {
            skip_existing: false,
            ..ReplicationOptions::default()
        };
        let (report, tally, events) = run(&src, &dst, &options, &CancellationToken::new());

        assert_eq!(report.files_copied, 1);
        assert_eq!(report.files_failed, 1);
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::JobFailed { entry_name, .. } if entry_name == "game"
        )));
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::JobFinished { .. })));
        // The 20 bytes of sub/b.txt leave the total.
        assert!(events.contains(&ProgressEvent::TotalAdjusted { new_total_bytes: 10 }));
        assert_eq!(tally.total_bytes, tally.cumulative_bytes);
        assert_bounded(&events, 30);
    }

    #[test]
    fn test_missing_source_reports_failure() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("missing");
        let dst = temp_dir.path().join("dst");

        let (report, tally, events) = run(
            &src,
            &dst,
            &ReplicationOptions::default(),
            &CancellationToken::new(),
        );

        assert_eq!(report.files_failed, 1);
        assert_eq!(tally.total_bytes, 0);
        assert!(matches!(events.first(), Some(ProgressEvent::JobFailed { .. })));
    }

    #[test]
    fn test_cancelled_job_copies_nothing() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        let dst = temp_dir.path().join("dst");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (report, _, events) = run(&src, &dst, &ReplicationOptions::default(), &cancel);

        assert!(report.cancelled);
        assert!(copied_paths(&events).is_empty());
        assert!(!events.iter().any(|e| matches!(e, ProgressEvent::JobFinished { .. })));
        assert!(!dst.join("a.txt").exists());
    }

    #[test]
    fn test_shrink_never_drops_below_copied() {
        let mut tally = RunTally {
            total_bytes: 10,
            cumulative_bytes: 8,
        };
        let mut events = Vec::new();

        tally.shrink(5, &mut events);
        assert_eq!(tally.total_bytes, 8);
        assert_eq!(events, vec![ProgressEvent::TotalAdjusted { new_total_bytes: 8 }]);

        tally.shrink(5, &mut events);
        assert_eq!(tally.total_bytes, 8);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_grown_file_then_skip_keeps_total_above_copied() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(dst.join("sub")).expect("Failed to create dst");
        fs::write(dst.join("sub/b.txt"), b"existing").expect("Failed to write existing");

        let grown = src.join("a.txt");
        let mut sink = AfterFirstChunk::new(move || {
            let mut file = fs::OpenOptions::new()
                .append(true)
                .open(&grown)
                .expect("Failed to open source for append");
            std::io::Write::write_all(&mut file, &[b'+'; 15]).expect("Failed to grow source");
        });
        let options = ReplicationOptions {
            chunk_size_bytes: 4,
            ..ReplicationOptions::default()
        };

        let (report, tally) =
            run_with(&src, &dst, 30, &options, &CancellationToken::new(), &mut sink);

        assert_eq!(report.files_copied, 1);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.bytes_copied, 25);
        assert_eq!(tally, RunTally { total_bytes: 25, cumulative_bytes: 25 });
        assert_bounded(&sink.events, 30);
    }

    #[test]
    fn test_file_growing_during_copy_raises_total() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = single_file_source(temp_dir.path(), 10);
        let dst = temp_dir.path().join("dst");

        let grown = src.join("a.txt");
        let mut sink = AfterFirstChunk::new(move || {
            let mut file = fs::OpenOptions::new()
                .append(true)
                .open(&grown)
                .expect("Failed to open source for append");
            std::io::Write::write_all(&mut file, &[b'+'; 5]).expect("Failed to grow source");
        });
        let options = ReplicationOptions {
            chunk_size_bytes: 4,
            ..ReplicationOptions::default()
        };

        let (report, tally) =
            run_with(&src, &dst, 10, &options, &CancellationToken::new(), &mut sink);

        assert_eq!(report.bytes_copied, 15);
        assert_eq!(tally, RunTally { total_bytes: 15, cumulative_bytes: 15 });
        assert!(sink
            .events
            .contains(&ProgressEvent::TotalAdjusted { new_total_bytes: 15 }));
        assert_bounded(&sink.events, 10);
        assert_eq!(fs::read(dst.join("a.txt")).expect("read a").len(), 15);
    }

    #[test]
    fn test_file_shrinking_during_copy_lowers_total() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = single_file_source(temp_dir.path(), 10);
        let dst = temp_dir.path().join("dst");

        let shrunk = src.join("a.txt");
        let mut sink = AfterFirstChunk::new(move || {
            fs::OpenOptions::new()
                .write(true)
                .open(&shrunk)
                .and_then(|file| file.set_len(4))
                .expect("Failed to truncate source");
        });
        let options = ReplicationOptions {
            chunk_size_bytes: 4,
            ..ReplicationOptions::default()
        };

        let (report, tally) =
            run_with(&src, &dst, 10, &options, &CancellationToken::new(), &mut sink);

        assert_eq!(report.files_copied, 1);
        assert_eq!(report.bytes_copied, 4);
        assert_eq!(tally, RunTally { total_bytes: 4, cumulative_bytes: 4 });
        assert!(sink
            .events
            .contains(&ProgressEvent::TotalAdjusted { new_total_bytes: 4 }));
        assert_bounded(&sink.events, 10);
    }

    #[test]
    fn test_listing_corrects_admission_estimate() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        let options = ReplicationOptions {
            skip_existing: false,
            ..ReplicationOptions::default()
        };

        let mut high = Vec::new();
        let (_, tally) = run_with(
            &src,
            &temp_dir.path().join("dst_high"),
            50,
            &options,
            &CancellationToken::new(),
            &mut high,
        );
        assert_eq!(high.first(), Some(&ProgressEvent::TotalAdjusted { new_total_bytes: 30 }));
        assert_eq!(tally, RunTally { total_bytes: 30, cumulative_bytes: 30 });

        let mut low = Vec::new();
        let (_, tally) = run_with(
            &src,
            &temp_dir.path().join("dst_low"),
            20,
            &options,
            &CancellationToken::new(),
            &mut low,
        );
        assert_eq!(low.first(), Some(&ProgressEvent::TotalAdjusted { new_total_bytes: 30 }));
        assert_eq!(tally, RunTally { total_bytes: 30, cumulative_bytes: 30 });
        assert_bounded(&low, 20);
    }

    #[test]
    fn test_source_equal_to_destination_is_contained() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = single_file_source(temp_dir.path(), 100);
        let options = ReplicationOptions {
            skip_existing: false,
            ..ReplicationOptions::default()
        };

        let mut events = Vec::new();
        let (report, tally) =
            run_with(&src, &src, 100, &options, &CancellationToken::new(), &mut events);

        assert_eq!(report.files_copied, 0);
        assert_eq!(report.files_failed, 1);
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::JobFailed { .. })));
        assert_eq!(tally, RunTally { total_bytes: 0, cumulative_bytes: 0 });
        assert_eq!(fs::read(src.join("a.txt")).expect("read a"), vec![b'a'; 100]);
    }

    #[test]
    fn test_uncreatable_empty_directory_counts_as_failure() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        fs::create_dir(src.join("empty")).expect("Failed to create empty dir");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(&dst).expect("Failed to create dst");
        fs::write(dst.join("empty"), b"blocker").expect("Failed to write blocker");

        let (report, _, events) = run(
            &src,
            &dst,
            &ReplicationOptions::default(),
            &CancellationToken::new(),
        );

        assert_eq!(report.files_copied, 2);
        assert_eq!(report.files_failed, 0);
        assert_eq!(report.directories_failed, 1);
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::JobFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_unwalkable_subdirectory_counts_as_failure() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = make_source(temp_dir.path());
        std::os::unix::fs::symlink(&src, src.join("sub/loop")).expect("Failed to create symlink");
        let dst = temp_dir.path().join("dst");

        let (report, _, events) = run(
            &src,
            &dst,
            &ReplicationOptions::default(),
            &CancellationToken::new(),
        );

        assert_eq!(report.files_copied, 2);
        assert_eq!(report.directories_failed, 1);
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::JobFailed { .. })));
    }

    #[test]
    fn test_copy_folder_itself_into_own_subdirectory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = single_file_source(temp_dir.path(), 10);
        let dst = src.join("backup");
        let options = ReplicationOptions {
            copy_source_folder_itself: true,
            ..ReplicationOptions::default()
        };

        let (report, _, _) = run(&src, &dst, &options, &CancellationToken::new());

        assert_eq!(report.files_copied, 1);
        assert_eq!(report.directories_failed, 0);
        assert!(dst.join("src/a.txt").is_file());
        assert!(!dst.join("src/backup").exists());
    }
}
