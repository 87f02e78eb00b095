//! Replication engine: admission, job sequencing and run lifecycle.
//!
//! A run takes an immutable `ReplicationRequest`, measures every entry,
//! drops the ones above the size cap, then executes the remaining copy jobs
//! one after another on a single background thread. Exactly one terminal
//! event (`Completed`, `Cancelled` or `NothingToCopy`) ends every run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::cancel::{ActiveGuard, CancellationToken};
use crate::error::{EngineError, Result};
use crate::job::{CopyJob, RunTally};
use crate::model::{JobPlan, ReplicationRequest, RunOutcome, RunSummary};
use crate::progress::{progress_channel, ProgressEvent, ProgressReceiver, ProgressSink};
use crate::size::{DiskSizeProbe, SizeProbe};

/// Starts replication runs, one at a time.
///
/// The single-run guard belongs to this instance. Separate engines do not
/// see each other's runs, so front ends should share one engine.
pub struct ReplicationEngine<P = DiskSizeProbe> {
    probe: Arc<P>,
    active: Arc<AtomicBool>,
}

impl ReplicationEngine<DiskSizeProbe> {
    pub fn new() -> Self {
        Self::with_probe(DiskSizeProbe)
    }
}

impl Default for ReplicationEngine<DiskSizeProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SizeProbe + 'static> ReplicationEngine<P> {
    pub fn with_probe(probe: P) -> Self {
        ReplicationEngine {
            probe: Arc::new(probe),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a run started by this engine has not finished.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a run on a background thread.
    ///
    /// # Errors
    /// `RunAlreadyActive` if a previous run is still going (that run is not
    /// affected), `WorkerSpawn` if the thread could not be created.
    pub fn start(&self, request: ReplicationRequest) -> Result<RunHandle> {
        let guard = ActiveGuard::acquire(&self.active).ok_or(EngineError::RunAlreadyActive)?;

        let interval = Duration::from_millis(request.options().progress_interval_ms);
        let (mut sink, events) = progress_channel(interval);
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let probe = Arc::clone(&self.probe);

        let worker = thread::Builder::new()
            .name("replication".to_string())
            .spawn(move || {
                let _guard = guard;
                execute(&request, probe.as_ref(), &mut sink, &worker_cancel)
            })
            .map_err(|e| EngineError::WorkerSpawn { source: e })?;

        Ok(RunHandle {
            events,
            cancel,
            worker,
        })
    }
}

/// Observer's handle on a running replication.
pub struct RunHandle {
    events: ProgressReceiver,
    cancel: CancellationToken,
    worker: JoinHandle<RunSummary>,
}

impl RunHandle {
    pub fn events(&self) -> &ProgressReceiver {
        &self.events
    }

    /// Ask the run to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the worker and return its summary.
    pub fn join(self) -> thread::Result<RunSummary> {
        self.worker.join()
    }
}

/// Run a request to completion on the calling thread.
///
/// This is what the background worker executes; it is public so callers
/// with their own threading can drive a run directly.
pub fn execute(
    request: &ReplicationRequest,
    probe: &dyn SizeProbe,
    sink: &mut dyn ProgressSink,
    cancel: &CancellationToken,
) -> RunSummary {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let options = request.options();

    log::info!(
        "run {}: {} entries, limit {} bytes",
        run_id,
        request.entries().len(),
        options.max_entry_size_bytes
    );

    let mut summary = RunSummary {
        run_id,
        outcome: RunOutcome::Completed,
        started_at,
        finished_at: started_at,
        entries_admitted: 0,
        entries_rejected: 0,
        files_copied: 0,
        files_skipped: 0,
        files_failed: 0,
        directories_failed: 0,
        total_bytes: 0,
        bytes_copied: 0,
    };

    let mut plans = Vec::new();
    let mut total_bytes = 0u64;

    for entry in request.entries() {
        if cancel.is_cancelled() {
            return finish(summary, RunOutcome::Cancelled, sink);
        }

        let size = probe.size_of(&entry.source);
        if size > options.max_entry_size_bytes {
            log::warn!(
                "skipped '{}': {} bytes exceeds limit of {} bytes",
                entry.name,
                size,
                options.max_entry_size_bytes
            );
            sink.emit(ProgressEvent::EntryRejected {
                entry_name: entry.name.clone(),
                size_bytes: size,
                limit_bytes: options.max_entry_size_bytes,
            });
            summary.entries_rejected += 1;
            continue;
        }

        total_bytes = total_bytes.saturating_add(size);
        plans.push(JobPlan::from_entry(entry, size, options));
    }

    summary.entries_admitted = plans.len();
    if plans.is_empty() {
        return finish(summary, RunOutcome::NothingToCopy, sink);
    }

    sink.emit(ProgressEvent::Started { total_bytes });
    let mut tally = RunTally::new(total_bytes);

    let mut outcome = RunOutcome::Completed;
    for plan in &plans {
        if cancel.is_cancelled() {
            outcome = RunOutcome::Cancelled;
            break;
        }

        let report = CopyJob::new(plan, options, cancel).run(&mut tally, sink);
        summary.files_copied += report.files_copied;
        summary.files_skipped += report.files_skipped;
        summary.files_failed += report.files_failed;
        summary.directories_failed += report.directories_failed;
        summary.bytes_copied += report.bytes_copied;

        if report.cancelled {
            outcome = RunOutcome::Cancelled;
            break;
        }
    }

    summary.total_bytes = tally.total_bytes;
    finish(summary, outcome, sink)
}

fn finish(mut summary: RunSummary, outcome: RunOutcome, sink: &mut dyn ProgressSink) -> RunSummary {
    summary.outcome = outcome;
    summary.finished_at = Utc::now();

    sink.emit(match outcome {
        RunOutcome::Completed => ProgressEvent::Completed,
        RunOutcome::Cancelled => ProgressEvent::Cancelled,
        RunOutcome::NothingToCopy => ProgressEvent::NothingToCopy,
    });
    log::info!(
        "run {}: {} ({} copied, {} skipped, {} failed, {} directories failed)",
        summary.run_id,
        outcome,
        summary.files_copied,
        summary.files_skipped,
        summary.files_failed,
        summary.directories_failed
    );

    summary
}
