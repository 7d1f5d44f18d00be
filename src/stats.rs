//! Run statistics shared by all workers

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for one run
///
/// Workers only increment; the totals are read once every worker has
/// finished.
#[derive(Debug, Default)]
pub struct RunStatistics {
    /// Files moved, or that would have been moved in a dry run
    pub processed: AtomicUsize,
    /// Files left in place because identical content already exists
    pub skipped_duplicates: AtomicUsize,
    /// Files whose processing failed
    pub errors: AtomicUsize,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.skipped_duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Plain copy of the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            skipped_duplicates: self.skipped_duplicates.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub processed: usize,
    pub skipped_duplicates: usize,
    pub errors: usize,
}

impl StatsSnapshot {
    /// Number of media files that reached a terminal outcome
    pub fn total(&self) -> usize {
        self.processed + self.skipped_duplicates + self.errors
    }

    pub fn summary(&self) -> String {
        format!(
            "Summary: Processed {}, Skipped/Duplicates {}, Errors {}",
            self.processed, self.skipped_duplicates, self.errors
        )
    }
}
