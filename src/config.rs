//! Run options and configuration file handling

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the destination root for images, created under the source root
pub const PHOTOS_DIR: &str = "Photos";

/// Name of the destination root for videos, created under the source root
pub const VIDEOS_DIR: &str = "Videos";

/// Extension sets used to classify media files
///
/// Entries are compared case-insensitively and without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaExtensions {
    /// Extensions organized into `Photos/`
    pub images: Vec<String>,
    /// Extensions organized into `Videos/`
    pub videos: Vec<String>,
}

impl Default for MediaExtensions {
    fn default() -> Self {
        Self {
            images: [
                "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "png", "heic", "cr2", "nef", "arw",
                "dng",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            videos: ["mp4", "avi", "mov", "mkv", "wmv", "m4v"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Options for a single organizing run
///
/// Built once by the presentation layer and left untouched while the run
/// is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Root of the tree to organize; `Photos/` and `Videos/` are created inside it
    pub source_root: PathBuf,

    /// Plan and log every decision without touching the filesystem
    pub dry_run: bool,

    /// Organize files classified as images
    pub organize_images: bool,

    /// Organize files classified as videos
    pub organize_videos: bool,

    /// Number of worker threads (0 = available parallelism)
    pub threads: usize,

    /// Ask FFprobe for creation dates of containers without a native parser
    pub use_ffprobe: bool,

    /// Extension sets for media classification
    pub extensions: MediaExtensions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            dry_run: false,
            organize_images: true,
            organize_videos: true,
            threads: 0,
            use_ffprobe: true,
            extensions: MediaExtensions::default(),
        }
    }
}

impl RunOptions {
    /// Options for organizing `source_root` with every other setting at its default
    pub fn for_source(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            ..Self::default()
        }
    }

    /// Destination root for images
    pub fn photos_root(&self) -> PathBuf {
        self.source_root.join(PHOTOS_DIR)
    }

    /// Destination root for videos
    pub fn videos_root(&self) -> PathBuf {
        self.source_root.join(VIDEOS_DIR)
    }

    /// Worker count, resolving 0 to the machine's available parallelism
    pub fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Load options from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let options: RunOptions = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(options)
    }

    /// Write the commented sample configuration to `path`
    pub fn write_sample_config<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_error = |e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, Self::sample_config()).map_err(write_error)?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Media Organizer Configuration File
# This file uses TOML format (https://toml.io)

# Folder to organize. Photos/ and Videos/ are created inside it.
source_root = "D:/Archive"

# Dry run mode - log every decision without moving anything
dry_run = true

# Which media classes to organize
organize_images = true
organize_videos = true

# Number of worker threads (0 = auto-detect)
threads = 0

# Use ffprobe (when on PATH) for video containers other than mp4/mov/m4v
use_ffprobe = true

# Recognized extensions (case-insensitive, without the dot)
[extensions]
images = ["jpg", "jpeg", "gif", "bmp", "tiff", "tif", "png", "heic", "cr2", "nef", "arw", "dng"]
videos = ["mp4", "avi", "mov", "mkv", "wmv", "m4v"]
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
        }
    }
}
