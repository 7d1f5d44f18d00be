//! Organizing engine with Rayon parallel processing
//!
//! Handles the core logic of:
//! - Streaming the source tree without collecting it first
//! - Resolving each file's capture date
//! - Planning its destination and resolving duplicates and name collisions
//! - Moving files (or simulating the move in dry-run mode)
//! - Counting outcomes and writing the run log

use crate::classify::FileClassifier;
use crate::config::RunOptions;
use crate::error::{Error, Result};
use crate::log::{LogSink, RunLog, run_log_file_name};
use crate::plan::{DestinationClaims, DestinationPlan, PathPlanner, PlanOutcome, lock};
use crate::stats::{RunStatistics, StatsSnapshot};
use crate::time::{self, DateResolver, MediaMetadataProbe, MetadataProbe, ResolvedDate, TimeSource};
use chrono::Local;
use rayon::prelude::*;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, debug, error, info, span, warn};
use walkdir::{DirEntry, WalkDir};

const SEPARATOR: &str = "--------------------------------------------------";
const BANNER: &str = "=========================================";

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: StatsSnapshot,
    /// Path of the run log written into the source root
    pub log_file: PathBuf,
    pub dry_run: bool,
}

/// Terminal state of one file
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileOutcome {
    /// Not a wanted media file, or already organized
    Ignored,
    Moved(DestinationPlan),
    Simulated(DestinationPlan),
    SkippedDuplicate(DestinationPlan),
}

/// Everything the workers of one run share
struct RunContext<'a> {
    log: &'a RunLog<'a>,
    stats: &'a RunStatistics,
    claims: &'a DestinationClaims,
}

/// Organizes a source tree into `Photos/yyyy-MM` and `Videos/yyyy-MM`
pub struct Organizer {
    options: RunOptions,
    classifier: FileClassifier,
    resolver: DateResolver,
    planner: PathPlanner,
}

impl Organizer {
    /// Create an organizer using the built-in metadata probe
    pub fn new(options: RunOptions) -> Self {
        let probe = MediaMetadataProbe {
            use_ffprobe: options.use_ffprobe,
        };
        Self::with_probe(options, Arc::new(probe))
    }

    /// Create an organizer reading capture dates through `probe`
    pub fn with_probe(options: RunOptions, probe: Arc<dyn MetadataProbe>) -> Self {
        Self {
            classifier: FileClassifier::new(&options.extensions),
            resolver: DateResolver::new(probe),
            planner: PathPlanner::new(&options),
            options,
        }
    }

    /// Run the organizing pipeline
    ///
    /// Only configuration problems (missing source root, unwritable run log,
    /// thread pool setup) fail the run. Per-file failures are counted and
    /// logged, and the run continues.
    pub fn run(&self, live: &dyn LogSink) -> Result<RunSummary> {
        let _span = span!(Level::INFO, "organizer_run", source = ?self.options.source_root).entered();
        let dry_run = self.options.dry_run;

        let (run_log, pool) = match self.start(live) {
            Ok(started) => started,
            Err(e) => {
                error!(error = %e, "Cannot start run");
                live.log(&format!("[ERROR] {}", e));
                return Err(e);
            }
        };
        let log_path = run_log.path().to_path_buf();

        let stats = RunStatistics::new();
        let claims = DestinationClaims::new();
        let ctx = RunContext {
            log: &run_log,
            stats: &stats,
            claims: &claims,
        };

        // par_bridge pulls entries from the walker on demand, so the tree is
        // never materialized. for_each returns once every file is done.
        pool.install(|| {
            WalkDir::new(&self.options.source_root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| !self.is_destination_root(e))
                .par_bridge()
                .for_each(|entry| self.handle_entry(entry, &ctx));
        });

        let snapshot = stats.snapshot();
        info!(
            processed = snapshot.processed,
            duplicates = snapshot.skipped_duplicates,
            errors = snapshot.errors,
            "Run complete"
        );

        run_log.file(SEPARATOR);
        run_log.line(&snapshot.summary());
        run_log.flush()?;

        let log_name = log_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        run_log.live("");
        run_log.live(BANNER);
        run_log.live(&format!("Run Complete! Log: {}", log_name));
        run_log.live(&format!("Processed: {}", snapshot.processed));
        run_log.live(&format!("Duplicates/Skipped: {}", snapshot.skipped_duplicates));
        run_log.live(&format!("Errors: {}", snapshot.errors));
        run_log.live(BANNER);

        Ok(RunSummary {
            stats: snapshot,
            log_file: log_path,
            dry_run,
        })
    }

    /// Validate the source root, create the destination roots and the run
    /// log, and build the worker pool
    fn start<'a>(&self, live: &'a dyn LogSink) -> Result<(RunLog<'a>, rayon::ThreadPool)> {
        let source = &self.options.source_root;
        let dry_run = self.options.dry_run;

        self.validate_source()?;

        live.log("Starting Organization...");
        live.log(&format!(
            "Mode: {}",
            if dry_run { "DRY RUN (No changes)" } else { "LIVE EXECUTION" }
        ));
        live.log("Scanning files (streaming mode)...");

        if !dry_run {
            if self.options.organize_images {
                create_root(self.planner.photos_root())?;
            }
            if self.options.organize_videos {
                create_root(self.planner.videos_root())?;
            }
        }

        let log_path = source.join(run_log_file_name(dry_run));
        let run_log = RunLog::create(&log_path, live).map_err(|e| Error::CreateFailed {
            path: log_path.clone(),
            source: e,
        })?;
        run_log.file(&format!(
            "Media Archive Organizer Log - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        run_log.file(&format!("Source: {}", source.display()));
        run_log.file(&format!("Dry Run: {}", dry_run));
        run_log.file(SEPARATOR);

        let workers = self.options.worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("organizer-{}", i))
            .build()?;
        info!(workers, dry_run, "Processing files");

        Ok((run_log, pool))
    }

    fn validate_source(&self) -> Result<()> {
        let source = &self.options.source_root;
        if !source.exists() {
            return Err(Error::SourceNotFound(source.clone()));
        }
        if !source.is_dir() {
            return Err(Error::SourceNotDirectory(source.clone()));
        }
        Ok(())
    }

    /// Prune `Photos/` and `Videos/` from the walk
    fn is_destination_root(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir() && self.planner.is_under_destination(entry.path())
    }

    /// Route one walk result: files are processed, unreadable directories
    /// are reported and skipped
    fn handle_entry(&self, entry: walkdir::Result<DirEntry>, ctx: &RunContext<'_>) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => self.process_entry(entry.path(), ctx),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Directory traversal error");
                ctx.log.line(&format!("[WARN] Cannot read {}", e));
            }
        }
    }

    /// Unit of work for one discovered file; nothing escapes it
    fn process_entry(&self, path: &Path, ctx: &RunContext<'_>) {
        let _file_span = span!(Level::DEBUG, "process_file", ?path).entered();

        match self.process_file(path, ctx) {
            Ok(FileOutcome::Ignored) => {}
            Ok(FileOutcome::Moved(plan)) => {
                ctx.stats.record_processed();
                info!(source = ?path, destination = ?plan.target_path(), "Moved file");
                ctx.log.line(&format!(
                    "[SUCCESS] {} -> {}{}",
                    file_name(path),
                    relative_destination(&plan),
                    rename_note(&plan)
                ));
            }
            Ok(FileOutcome::Simulated(plan)) => {
                ctx.stats.record_processed();
                info!(source = ?path, destination = ?plan.target_path(), "Would move file");
                ctx.log.line(&format!(
                    "[DRY RUN] {} -> {}{}",
                    file_name(path),
                    relative_destination(&plan),
                    rename_note(&plan)
                ));
            }
            Ok(FileOutcome::SkippedDuplicate(plan)) => {
                ctx.stats.record_duplicate();
                info!(source = ?path, existing = ?plan.target_path(), "Skipped duplicate");
                ctx.log.line(&format!(
                    "[DUPLICATE] Skipped {} (Identical to existing {})",
                    file_name(path),
                    plan.target_file_name
                ));
            }
            Err(e) => {
                ctx.stats.record_error();
                error!(?path, error = %e, "Failed to process file");
                ctx.log.line(&format!(
                    "[ERROR] Error processing {}: {}",
                    file_name(path),
                    e
                ));
            }
        }
    }

    fn process_file(&self, path: &Path, ctx: &RunContext<'_>) -> Result<FileOutcome> {
        // Already organized files stay where they are
        if self.planner.is_under_destination(path) {
            return Ok(FileOutcome::Ignored);
        }
        if !self.classifier.should_organize(path, &self.options) {
            return Ok(FileOutcome::Ignored);
        }
        let class = self.classifier.classify(path);

        let date = self.resolve_date(path)?;
        debug!(?path, timestamp = %date.timestamp, source = ?date.source, "Resolved date");

        let folder = self
            .planner
            .target_folder(&date.timestamp, class)
            .ok_or_else(|| Error::InvalidFileName(path.to_path_buf()))?;

        // Plan and act while holding the folder's claims so no other worker
        // can pick the same name in between
        let folder_claims = ctx.claims.folder(&folder);
        let mut claims = lock(&folder_claims);
        let plan = self
            .planner
            .plan_with_claims(path, &date.timestamp, class, &claims)?;

        match plan.outcome {
            PlanOutcome::SkipDuplicate => Ok(FileOutcome::SkippedDuplicate(plan)),
            PlanOutcome::Move | PlanOutcome::RenameCollision if self.options.dry_run => {
                claims.claim(plan.target_file_name.clone(), path.to_path_buf());
                Ok(FileOutcome::Simulated(plan))
            }
            PlanOutcome::Move | PlanOutcome::RenameCollision => {
                move_file(path, &plan.target_path())?;
                Ok(FileOutcome::Moved(plan))
            }
        }
    }

    /// Embedded metadata date, falling back to the modification time
    fn resolve_date(&self, path: &Path) -> Result<ResolvedDate> {
        if let Some(timestamp) = self.resolver.resolve_date(path) {
            return Ok(ResolvedDate {
                timestamp,
                source: TimeSource::Metadata,
            });
        }

        let timestamp = time::modified_time(path).map_err(|e| Error::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(ResolvedDate {
            timestamp,
            source: TimeSource::FileSystem,
        })
    }
}

/// Organize with the built-in metadata probe
pub fn organize(options: RunOptions, live: &dyn LogSink) -> Result<RunSummary> {
    Organizer::new(options).run(live)
}

fn create_root(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::CreateFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `yyyy-MM/<name>` as shown in log lines
fn relative_destination(plan: &DestinationPlan) -> String {
    let month = plan
        .target_folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}", month, plan.target_file_name)
}

fn rename_note(plan: &DestinationPlan) -> &'static str {
    if plan.outcome == PlanOutcome::RenameCollision {
        " (renamed, name taken)"
    } else {
        ""
    }
}

/// Move a file without ever replacing an existing destination
///
/// Renames when possible and falls back to copy + delete across filesystems.
fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    if dest.exists() {
        return Err(Error::DestinationTaken(dest.to_path_buf()));
    }

    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(?source, ?dest, "Cross-device move, copying instead");
            copy_file(source, dest)?;

            // Preserve modification time
            if let Ok(mtime) = fs::metadata(source).and_then(|m| m.modified()) {
                let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
            }

            if let Err(e) = fs::remove_file(source) {
                // Leave exactly one copy behind
                let _ = fs::remove_file(dest);
                return Err(e.into());
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Copy file with buffered I/O, refusing to overwrite
fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let src_file = File::open(source)?;
    let dest_file = OpenOptions::new().write(true).create_new(true).open(dest)?;

    let mut reader = BufReader::with_capacity(256 * 1024, src_file);
    let mut writer = BufWriter::with_capacity(256 * 1024, dest_file);

    let copied = io::copy(&mut reader, &mut writer);
    let flushed = copied.and_then(|_| writer.flush());
    if let Err(e) = flushed {
        let _ = fs::remove_file(dest);
        return Err(e.into());
    }
    Ok(())
}
