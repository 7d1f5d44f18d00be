//! Error types for the media organizer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media organizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the media organizer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Source path is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("Invalid file name: {}", .0.display())]
    InvalidFileName(PathBuf),

    #[error("No free name left for {} after {attempts} attempts", path.display())]
    CollisionExhausted { path: PathBuf, attempts: u32 },

    #[error("Destination already exists: {}", .0.display())]
    DestinationTaken(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot create {}: {source}", path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
