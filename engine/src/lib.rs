//! # SaveManager Engine - Directory Replication Library
//!
//! A headless engine that replicates named source directories into their
//! destinations and finds directories holding save-game files. Front ends
//! (the bundled CLI, or any other UI) drive it and render its progress.
//!
//! ## Overview
//!
//! - Size-capped admission of entries before anything is copied
//! - Sequential copy jobs, chunked file copies, per-file error isolation
//! - Skip-existing or overwrite policy
//! - Progress events over a channel, polled by the observer
//! - Cooperative cancellation at job, file and chunk boundaries
//! - Single-flight runs: a second start while one is active is rejected
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{Entry, ProgressTracker, ReplicationEngine, ReplicationOptions, ReplicationRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let entries = vec![Entry::new("MyGame", "/home/me/.mygame/saves", "/mnt/backup")?];
//! let request = ReplicationRequest::new(&entries, ReplicationOptions::default());
//!
//! let engine = ReplicationEngine::new();
//! let handle = engine.start(request)?;
//!
//! let mut tracker = ProgressTracker::new();
//! for event in handle.events().iter() {
//!     tracker.apply(&event);
//!     println!("{:.0}%", tracker.fraction() * 100.0);
//! }
//! let summary = handle.join().expect("replication worker panicked");
//! println!("{}", summary.outcome);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Entries, requests, plans and summaries
//! - **error**: Error types
//! - **cancel**: Cancellation token
//! - **size**: Directory size probe
//! - **fs_ops**: Tree enumeration and chunked file copy
//! - **job**: A single entry's copy job
//! - **progress**: Progress events, channel and tracker
//! - **replication**: Run admission, sequencing and lifecycle
//! - **scanner**: Save-file directory scanner
//! - **store**: Persisted entry list
//! - **config**: Settings file

pub mod cancel;
pub mod config;
pub mod error;
pub mod fs_ops;
pub mod job;
pub mod model;
pub mod progress;
pub mod replication;
pub mod scanner;
pub mod size;
pub mod store;

// Re-export main types and functions
pub use cancel::CancellationToken;
pub use config::Settings;
pub use error::EngineError;
pub use model::{
    Entry, FileTask, JobPlan, JobReport, ReplicationOptions, ReplicationRequest, RunOutcome,
    RunSummary,
};
pub use progress::{ProgressEvent, ProgressReceiver, ProgressSink, ProgressTracker};
pub use replication::{ReplicationEngine, RunHandle};
pub use scanner::{SaveFileScanner, ScanEvent, ScanHandle, ScanResult};
pub use size::{DiskSizeProbe, SizeProbe};
pub use store::EntryStore;
