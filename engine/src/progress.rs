//! Progress reporting.
//!
//! The engine emits `ProgressEvent`s into a `ProgressSink`. The usual sink is
//! the sending half of a progress channel: the copy thread produces, the
//! observer polls the `EventReceiver` on its own schedule and folds events
//! into a `ProgressTracker`. Sending never blocks.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::model::RunOutcome;

/// One step of a replication run, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// An entry was larger than the admission cap and will not be copied
    EntryRejected {
        entry_name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },
    /// Admission finished; copying begins
    Started { total_bytes: u64 },
    /// A job (one admitted entry) begins
    JobStarted {
        entry_name: String,
        destination_root: PathBuf,
        file_count: usize,
    },
    /// Running byte count for the whole run
    BytesCopied { cumulative_bytes: u64 },
    /// The denominator changed (skipped file, size drift, failed file)
    TotalAdjusted { new_total_bytes: u64 },
    FileSkipped { relative_path: PathBuf },
    FileCopied { relative_path: PathBuf },
    /// A file or subtree of an entry could not be copied; the job continues
    JobFailed { entry_name: String, message: String },
    /// A job ran to its end
    JobFinished {
        entry_name: String,
        files_copied: usize,
        files_skipped: usize,
        files_failed: usize,
    },
    /// Terminal: no entry passed admission
    NothingToCopy,
    /// Terminal: stopped at a checkpoint
    Cancelled,
    /// Terminal: every admitted job ran
    Completed,
}

impl ProgressEvent {
    /// True for the single event that ends a run's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Completed | ProgressEvent::Cancelled | ProgressEvent::NothingToCopy
        )
    }
}

/// Receives progress events from a run.
///
/// Called synchronously on the run's thread, so implementations must not block.
pub trait ProgressSink: Send {
    fn emit(&mut self, event: ProgressEvent);
}

impl ProgressSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

/// Sending half of a progress channel.
///
/// `BytesCopied` events closer together than `interval` are coalesced: only
/// the latest pending count is kept, and it is always flushed before the
/// next event of any other kind.
pub struct ChannelSink {
    sender: Sender<ProgressEvent>,
    interval: Duration,
    last_sent: Option<Instant>,
    pending_bytes: Option<u64>,
}

impl ChannelSink {
    fn send(&self, event: ProgressEvent) {
        // A dropped receiver means nobody is watching; the run still finishes.
        let _ = self.sender.send(event);
    }

    fn flush_pending(&mut self) {
        if let Some(cumulative_bytes) = self.pending_bytes.take() {
            self.send(ProgressEvent::BytesCopied { cumulative_bytes });
            self.last_sent = Some(Instant::now());
        }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::BytesCopied { cumulative_bytes } => {
                let due = self
                    .last_sent
                    .map_or(true, |at| at.elapsed() >= self.interval);
                if due {
                    self.pending_bytes = None;
                    self.send(event);
                    self.last_sent = Some(Instant::now());
                } else {
                    self.pending_bytes = Some(cumulative_bytes);
                }
            }
            other => {
                self.flush_pending();
                self.send(other);
            }
        }
    }
}

impl Drop for ChannelSink {
    fn drop(&mut self) {
        self.flush_pending();
    }
}

/// Receiving half of an event channel. Polling never blocks the producer.
#[derive(Debug)]
pub struct EventReceiver<E> {
    receiver: Receiver<E>,
}

impl<E> EventReceiver<E> {
    pub(crate) fn new(receiver: Receiver<E>) -> Self {
        EventReceiver { receiver }
    }

    /// Drain whatever has arrived so far.
    pub fn poll(&self) -> Vec<E> {
        self.receiver.try_iter().collect()
    }

    /// Wait up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout or once the producer is gone and the queue is empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<E> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Blocking iterator that ends when the producer hangs up.
    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        self.receiver.iter()
    }
}

pub type ProgressReceiver = EventReceiver<ProgressEvent>;

/// Create a progress channel whose byte-count events are spaced at least `interval` apart.
pub fn progress_channel(interval: Duration) -> (ChannelSink, ProgressReceiver) {
    let (sender, receiver) = unbounded();
    let sink = ChannelSink {
        sender,
        interval,
        last_sent: None,
        pending_bytes: None,
    };
    (sink, EventReceiver::new(receiver))
}

/// Observer-side view of a run, built by applying events in order.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    pub started: bool,
    pub total_bytes: u64,
    pub cumulative_bytes: u64,
    pub current_entry: Option<String>,
    pub jobs_finished: usize,
    pub files_copied: usize,
    pub files_skipped: usize,
    pub failures: usize,
    pub rejected_entries: usize,
    /// Human-readable lines for rejections and failures
    pub messages: Vec<String>,
    pub outcome: Option<RunOutcome>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::EntryRejected {
                entry_name,
                size_bytes,
                limit_bytes,
            } => {
                self.rejected_entries += 1;
                self.messages.push(format!(
                    "Skipped '{}' ({} bytes exceeds limit of {} bytes)",
                    entry_name, size_bytes, limit_bytes
                ));
            }
            ProgressEvent::Started { total_bytes } => {
                self.started = true;
                self.total_bytes = *total_bytes;
                self.cumulative_bytes = 0;
            }
            ProgressEvent::JobStarted { entry_name, .. } => {
                self.current_entry = Some(entry_name.clone());
            }
            ProgressEvent::BytesCopied { cumulative_bytes } => {
                self.cumulative_bytes = *cumulative_bytes;
            }
            ProgressEvent::TotalAdjusted { new_total_bytes } => {
                self.total_bytes = *new_total_bytes;
            }
            ProgressEvent::FileSkipped { .. } => self.files_skipped += 1,
            ProgressEvent::FileCopied { .. } => self.files_copied += 1,
            ProgressEvent::JobFailed {
                entry_name,
                message,
            } => {
                self.failures += 1;
                self.messages
                    .push(format!("Error copying {}: {}", entry_name, message));
            }
            ProgressEvent::JobFinished { .. } => {
                self.jobs_finished += 1;
                self.current_entry = None;
            }
            ProgressEvent::NothingToCopy => self.outcome = Some(RunOutcome::NothingToCopy),
            ProgressEvent::Cancelled => self.outcome = Some(RunOutcome::Cancelled),
            ProgressEvent::Completed => self.outcome = Some(RunOutcome::Completed),
        }
    }

    /// Completed fraction in `[0, 1]`. A started run with nothing left to copy counts as done.
    pub fn fraction(&self) -> f64 {
        if !self.started {
            return 0.0;
        }
        fraction(self.cumulative_bytes, self.total_bytes)
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }
}

/// `done / total` clamped to `[0, 1]`; a zero total is complete.
pub fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (done as f64 / total as f64).clamp(0.0, 1.0)
}
