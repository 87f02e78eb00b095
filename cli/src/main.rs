//! SaveManager - Command-line front end for the replication engine.
//!
//! Registers named source/destination folder pairs, replicates them with a
//! progress display, and scans the filesystem for save-game folders.

use clap::{ArgAction, Parser, Subcommand};
use engine::config::{default_config_dir, DEFAULT_SETTINGS_FILE};
use engine::scanner::{default_scan_roots, normalize_extensions};
use engine::store::DEFAULT_STORE_FILE;
use engine::{
    progress::fraction, Entry, EntryStore, ProgressEvent, ProgressTracker, ReplicationEngine,
    ReplicationRequest, RunSummary, SaveFileScanner, ScanEvent, Settings,
};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// How often the observer loop drains the event channel.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// SaveManager - back up game save folders
#[derive(Parser, Debug)]
#[command(name = "savemgr")]
#[command(version = "0.1.0")]
#[command(about = "Replicate save folders to backup locations and find save-game directories")]
struct Args {
    /// Entry store file (default: <config dir>/savemgr/save_folders.json)
    #[arg(long, value_name = "PATH", global = true)]
    store: Option<PathBuf>,

    /// Settings file (default: <config dir>/savemgr/settings.json)
    #[arg(long, value_name = "PATH", global = true)]
    settings: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a named source/destination pair
    Add {
        /// Display name for the entry
        #[arg(long)]
        name: String,

        /// Source directory
        #[arg(long, value_name = "PATH")]
        src: PathBuf,

        /// Destination directory
        #[arg(long, value_name = "PATH")]
        dst: PathBuf,
    },

    /// Show registered entries
    List,

    /// Remove every entry and delete the store file
    Clear,

    /// Copy every registered entry to its destination
    Copy {
        /// Skip entries larger than this many GiB
        #[arg(long, value_name = "GB")]
        max_size_gb: Option<f64>,

        /// Overwrite files that already exist at the destination
        #[arg(long)]
        overwrite: bool,

        /// Copy into <destination>/<source folder name>
        #[arg(long)]
        copy_folder_itself: bool,
    },

    /// Find directories that contain save-game files
    Scan {
        /// Directory to search (repeatable; default: well-known save locations)
        #[arg(long = "root", value_name = "PATH")]
        roots: Vec<PathBuf>,

        /// File extension to look for (repeatable; default from settings)
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,
    },
}

/// Renders replication progress on stderr.
struct CliProgress {
    verbose: bool,
    tracker: ProgressTracker,
    start_time: Instant,
    last_progress_update: Option<Instant>,
}

impl CliProgress {
    fn new(verbose: bool) -> Self {
        CliProgress {
            verbose,
            tracker: ProgressTracker::new(),
            start_time: Instant::now(),
            last_progress_update: None,
        }
    }

    fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }

    fn format_duration(elapsed: Duration) -> String {
        let secs = elapsed.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }

    fn progress_bar(fraction: f64) -> String {
        let percent = (fraction * 100.0).round() as u32;
        let filled = (percent / 5) as usize;
        let empty = 20 - filled;
        format!("[{}{}] {}%", "=".repeat(filled), " ".repeat(empty), percent)
    }

    fn print_progress(&mut self, force: bool) {
        // Max once per 200ms unless forced
        if !force {
            if let Some(at) = self.last_progress_update {
                if at.elapsed().as_millis() < 200 {
                    return;
                }
            }
        }
        self.last_progress_update = Some(Instant::now());

        eprint!(
            "\rProgress: {} | {}/{}",
            Self::progress_bar(self.tracker.fraction()),
            Self::format_bytes(self.tracker.cumulative_bytes),
            Self::format_bytes(self.tracker.total_bytes)
        );
        let _ = std::io::Write::flush(&mut std::io::stderr());
    }

    fn handle(&mut self, event: &ProgressEvent) {
        self.tracker.apply(event);

        match event {
            ProgressEvent::EntryRejected {
                entry_name,
                size_bytes,
                limit_bytes,
            } => {
                eprintln!(
                    "Skipped '{}' (size: {:.2} GB) as it exceeds {:.2} GB.",
                    entry_name,
                    *size_bytes as f64 / GIB,
                    *limit_bytes as f64 / GIB
                );
            }
            ProgressEvent::Started { total_bytes } => {
                eprintln!("Copying directories... ({})", Self::format_bytes(*total_bytes));
            }
            ProgressEvent::JobStarted {
                entry_name,
                destination_root,
                file_count,
            } => {
                if self.verbose {
                    eprintln!(
                        "\n[{}] {} files -> {}",
                        entry_name,
                        file_count,
                        destination_root.display()
                    );
                }
            }
            ProgressEvent::BytesCopied { .. } | ProgressEvent::TotalAdjusted { .. } => {
                self.print_progress(false);
            }
            ProgressEvent::FileCopied { relative_path } => {
                if self.verbose {
                    eprintln!("\r  Copied: {}", relative_path.display());
                }
            }
            ProgressEvent::FileSkipped { relative_path } => {
                if self.verbose {
                    eprintln!("\r  Skipped (exists): {}", relative_path.display());
                }
            }
            ProgressEvent::JobFailed {
                entry_name,
                message,
            } => {
                eprintln!("\rError copying {}: {}", entry_name, message);
            }
            ProgressEvent::JobFinished {
                entry_name,
                files_copied,
                files_skipped,
                files_failed,
            } => {
                self.print_progress(true);
                eprintln!(
                    "\nCopied '{}': {} copied, {} skipped, {} failed",
                    entry_name, files_copied, files_skipped, files_failed
                );
            }
            ProgressEvent::NothingToCopy => {
                eprintln!("No entries within the size limit; nothing to copy.");
            }
            ProgressEvent::Cancelled => {
                eprintln!();
                eprintln!("Copying cancelled.");
            }
            ProgressEvent::Completed => {
                eprintln!();
                eprintln!("Copying completed.");
            }
        }
    }

    fn print_summary(&self, summary: &RunSummary) {
        eprintln!(
            "Summary: {} copied, {} skipped, {} failed ({} entries copied, {} over the limit)",
            summary.files_copied,
            summary.files_skipped,
            summary.files_failed,
            summary.entries_admitted,
            summary.entries_rejected
        );
        if summary.directories_failed > 0 {
            eprintln!("Directories failed: {}", summary.directories_failed);
        }
        eprintln!("Bytes copied: {}", Self::format_bytes(summary.bytes_copied));
        eprintln!("Elapsed: {}", Self::format_duration(self.start_time.elapsed()));
        log::info!(
            "run {} finished at {}",
            summary.run_id,
            summary.finished_at.to_rfc3339()
        );

        if !self.tracker.messages.is_empty() {
            eprintln!();
            eprintln!("Problems:");
            for message in &self.tracker.messages {
                eprintln!("  {}", message);
            }
        }
    }
}

/// Parse arguments, set up logging, then run the command
fn main() {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(if args.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let exit_code = match run_cli(&args) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

fn default_path(file_name: &str) -> PathBuf {
    default_config_dir()
        .map(|dir| dir.join(file_name))
        .unwrap_or_else(|| PathBuf::from(file_name))
}

fn store_path(args: &Args) -> PathBuf {
    args.store
        .clone()
        .unwrap_or_else(|| default_path(DEFAULT_STORE_FILE))
}

fn settings_path(args: &Args) -> PathBuf {
    args.settings
        .clone()
        .unwrap_or_else(|| default_path(DEFAULT_SETTINGS_FILE))
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<(), String> {
    match &args.command {
        Command::Add { name, src, dst } => {
            let entry = Entry::new(name.as_str(), src, dst).map_err(|e| e.to_string())?;
            let mut store = EntryStore::load(store_path(args)).map_err(|e| e.to_string())?;
            eprintln!("Added entry: {}", entry);
            store.add(entry).map_err(|e| e.to_string())
        }
        Command::List => {
            let store = EntryStore::load(store_path(args)).map_err(|e| e.to_string())?;
            if store.entries().is_empty() {
                eprintln!("No entries.");
            }
            for entry in store.entries() {
                println!("{}", entry);
            }
            Ok(())
        }
        Command::Clear => {
            let mut store = EntryStore::load(store_path(args)).map_err(|e| e.to_string())?;
            store.clear().map_err(|e| e.to_string())?;
            eprintln!("All entries cleared.");
            Ok(())
        }
        Command::Copy {
            max_size_gb,
            overwrite,
            copy_folder_itself,
        } => run_copy(args, *max_size_gb, *overwrite, *copy_folder_itself),
        Command::Scan { roots, extensions } => run_scan(args, roots, extensions),
    }
}

fn run_copy(
    args: &Args,
    max_size_gb: Option<f64>,
    overwrite: bool,
    copy_folder_itself: bool,
) -> Result<(), String> {
    let store = EntryStore::load(store_path(args)).map_err(|e| e.to_string())?;
    if store.entries().is_empty() {
        eprintln!("No entries to copy.");
        return Ok(());
    }

    let settings = Settings::load(&settings_path(args)).map_err(|e| e.to_string())?;
    let mut options = settings.replication_options();
    if let Some(gb) = max_size_gb {
        if !gb.is_finite() || gb < 0.0 {
            return Err(format!("Invalid size limit '{}'. Must be a positive number of GB", gb));
        }
        options.max_entry_size_bytes = (gb * GIB) as u64;
    }
    if overwrite {
        options.skip_existing = false;
    }
    if copy_folder_itself {
        options.copy_source_folder_itself = true;
    }

    let engine = ReplicationEngine::new();
    let handle = engine
        .start(ReplicationRequest::new(store.entries(), options))
        .map_err(|e| format!("Failed to start copy: {}", e))?;

    let mut progress = CliProgress::new(args.verbose > 0);
    loop {
        // Read before draining so events sent just before exit are not missed.
        let worker_done = handle.is_finished();
        for event in handle.events().poll() {
            progress.handle(&event);
        }
        if progress.tracker.is_finished() || worker_done {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    let summary = handle
        .join()
        .map_err(|_| "Replication worker panicked".to_string())?;
    progress.print_summary(&summary);

    if summary.has_failures() {
        Err("One or more files failed to copy".to_string())
    } else {
        Ok(())
    }
}

fn run_scan(args: &Args, roots: &[PathBuf], extensions: &[String]) -> Result<(), String> {
    let roots = if roots.is_empty() {
        default_scan_roots()
    } else {
        roots.to_vec()
    };
    if roots.is_empty() {
        return Err("No directories to scan".to_string());
    }

    let extensions = if extensions.is_empty() {
        let settings = Settings::load(&settings_path(args)).map_err(|e| e.to_string())?;
        normalize_extensions(&settings.scan_extensions)
    } else {
        normalize_extensions(extensions)
    };
    if extensions.is_empty() {
        return Err("No file extensions to look for".to_string());
    }

    let scanner = SaveFileScanner::new();
    let handle = scanner
        .start(roots, extensions)
        .map_err(|e| format!("Failed to start scan: {}", e))?;

    let mut matches = Vec::new();
    let mut finished = false;
    while !finished {
        let worker_done = handle.is_finished();
        for event in handle.events().poll() {
            match event {
                ScanEvent::DirectoryProcessed {
                    processed_count,
                    total_count,
                } => {
                    eprint!(
                        "\rScanning... {}/{} directories ({:.0}%)",
                        processed_count,
                        total_count,
                        fraction(processed_count as u64, total_count as u64) * 100.0
                    );
                }
                ScanEvent::DirectoryUnreadable { path, message } => {
                    if args.verbose > 0 {
                        eprintln!("\rCannot read {}: {}", path.display(), message);
                    }
                }
                ScanEvent::ScanComplete {
                    matched_directories,
                } => {
                    matches = matched_directories;
                    finished = true;
                }
                ScanEvent::Cancelled => finished = true,
            }
        }
        if worker_done {
            finished = true;
        }
        if !finished {
            thread::sleep(POLL_INTERVAL);
        }
    }
    eprintln!();

    handle
        .join()
        .map_err(|_| "Scan worker panicked".to_string())?;

    if matches.is_empty() {
        eprintln!("No save files found.");
    }
    for dir in &matches {
        println!("{}", dir.display());
    }
    Ok(())
}
