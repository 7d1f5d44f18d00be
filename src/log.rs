//! Run log fan-out
//!
//! Every user-facing line goes to two sinks: the live [`LogSink`] supplied by
//! the presentation layer and an append-only `process_log_*.txt` file in the
//! source root. Each sink has its own lock, so lines never interleave.

use crate::plan::lock;
use chrono::Local;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Receives human-readable log lines
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// Sink that drops every line
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _line: &str) {}
}

/// Sink that keeps every line in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }
}

impl LogSink for MemorySink {
    fn log(&self, line: &str) {
        lock(&self.lines).push(line.to_string());
    }
}

/// File name for a run log started now
pub fn run_log_file_name(dry_run: bool) -> String {
    format!(
        "process_log_{}{}.txt",
        Local::now().format("%Y%m%d_%H%M%S"),
        if dry_run { "_DRYRUN" } else { "" }
    )
}

/// Fan-out logger for one run
pub struct RunLog<'a> {
    live: &'a dyn LogSink,
    live_lock: Mutex<()>,
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl<'a> RunLog<'a> {
    /// Create (truncating) the run log file at `path`
    pub fn create(path: &Path, live: &'a dyn LogSink) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            live,
            live_lock: Mutex::new(()),
            file: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a line to both sinks
    pub fn line(&self, line: &str) {
        self.live(line);
        self.file(line);
    }

    /// Write a line to the live sink only
    pub fn live(&self, line: &str) {
        let _guard = lock(&self.live_lock);
        self.live.log(line);
    }

    /// Write a line to the run log file only
    pub fn file(&self, line: &str) {
        let mut file = lock(&self.file);
        if let Err(e) = writeln!(file, "{}", line) {
            warn!(path = ?self.path, error = %e, "Failed to write run log");
        }
    }

    /// Flush buffered lines to disk
    pub fn flush(&self) -> std::io::Result<()> {
        lock(&self.file).flush()
    }
}

impl Drop for RunLog<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = ?self.path, error = %e, "Failed to flush run log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_run_log_file_name() {
        let live = run_log_file_name(false);
        assert!(live.starts_with("process_log_"));
        assert!(live.ends_with(".txt"));
        assert!(!live.contains("DRYRUN"));
        // process_log_ + yyyyMMdd_HHmmss + .txt
        assert_eq!(live.len(), "process_log_".len() + 15 + ".txt".len());

        assert!(run_log_file_name(true).ends_with("_DRYRUN.txt"));
    }

    #[test]
    fn test_lines_reach_both_sinks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.txt");
        let sink = MemorySink::new();

        {
            let log = RunLog::create(&path, &sink).unwrap();
            assert_eq!(log.path(), path);
            log.line("both");
            log.live("live only");
            log.file("file only");
        }

        assert_eq!(sink.lines(), vec!["both", "live only"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "both\nfile only\n");
    }

    #[test]
    fn test_concurrent_lines_stay_whole() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.txt");
        let sink = NullSink;
        let log = Arc::new(RunLog::create(&path, &sink).unwrap());

        thread::scope(|scope| {
            for worker in 0..8 {
                let log = Arc::clone(&log);
                scope.spawn(move || {
                    for i in 0..200 {
                        log.line(&format!("worker {worker} line {i} {}", "x".repeat(64)));
                    }
                });
            }
        });
        log.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 1600);
        assert!(lines.iter().all(|l| l.starts_with("worker ") && l.ends_with(&"x".repeat(64))));
    }
}
