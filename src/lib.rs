//! Media Organizer - sorts photo and video archives by capture date
//!
//! This library provides functionality for organizing a media archive in
//! place with support for:
//! - EXIF metadata extraction for images
//! - QuickTime header and FFprobe-based metadata extraction for videos
//! - File system timestamp fallback
//! - BLAKE3-based duplicate detection
//! - Parallel processing with Rayon over a streamed directory walk
//! - Dry-run simulation that reports exactly what a live run would do

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod hash;
pub mod log;
pub mod plan;
pub mod process;
pub mod stats;
pub mod time;

pub use classify::{FileClassifier, MediaClass};
pub use cli::Cli;
pub use config::{ConfigError, MediaExtensions, RunOptions};
pub use error::{Error, Result};
pub use log::{LogSink, MemorySink, NullSink};
pub use plan::{DestinationPlan, PathPlanner, PlanOutcome};
pub use process::{Organizer, RunSummary, organize};
pub use stats::StatsSnapshot;
pub use time::{DateResolver, MediaMetadataProbe, MetadataProbe};
