//! CLI argument parsing with clap

use crate::config::RunOptions;
use clap::Parser;
use std::path::PathBuf;

/// Media Organizer - sort photo and video archives by capture date
///
/// Moves every photo into `Photos/yyyy-MM/` and every video into
/// `Videos/yyyy-MM/` under the source folder, prefixing names with the
/// capture date. Identical files are skipped and name clashes get a
/// numeric suffix.
#[derive(Parser, Debug)]
#[command(name = "media-organizer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Folder to organize (prompted for when omitted)
    pub source: Option<PathBuf>,

    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Dry run mode - log what would be done without touching any file
    #[arg(short = 'n', long, conflicts_with = "live")]
    pub dry_run: bool,

    /// Move files even if the config file asks for a dry run
    #[arg(long)]
    pub live: bool,

    /// Leave images where they are
    #[arg(long)]
    pub no_images: bool,

    /// Leave videos where they are
    #[arg(long)]
    pub no_videos: bool,

    /// Never call ffprobe; videos without a readable movie header fall back
    /// to their modification time
    #[arg(long)]
    pub no_ffprobe: bool,

    /// Number of threads for parallel processing (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output the diagnostic trace file as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Write diagnostic traces to this file
    #[arg(long, env = "MEDIA_ORGANIZER_TRACE_LOG")]
    pub trace_log: Option<PathBuf>,

    /// Write a sample configuration file to this path and exit
    #[arg(long)]
    pub write_config: Option<PathBuf>,
}

impl Cli {
    /// Whether the dry-run mode was decided on the command line
    pub fn mode_given(&self) -> bool {
        self.dry_run || self.live
    }

    /// Merge CLI arguments with options from a config file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut options: RunOptions) -> RunOptions {
        if let Some(ref source) = self.source {
            options.source_root = source.clone();
        }
        if self.dry_run {
            options.dry_run = true;
        }
        if self.live {
            options.dry_run = false;
        }
        if self.no_images {
            options.organize_images = false;
        }
        if self.no_videos {
            options.organize_videos = false;
        }
        if self.no_ffprobe {
            options.use_ffprobe = false;
        }
        if let Some(threads) = self.threads {
            options.threads = threads;
        }

        options
    }

    /// Convert CLI arguments to options (when no config file is used)
    pub fn to_options(&self) -> RunOptions {
        self.merge_with_config(RunOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("media-organizer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["/archive"]);
        let options = cli.to_options();
        assert_eq!(options.source_root, PathBuf::from("/archive"));
        assert!(!options.dry_run);
        assert!(options.organize_images);
        assert!(options.organize_videos);
        assert_eq!(options.threads, 0);
        assert!(options.use_ffprobe);
        assert!(!cli.mode_given());
    }

    #[test]
    fn test_flags() {
        let cli = parse(&["-n", "--no-videos", "--no-ffprobe", "-t", "4", "/archive"]);
        let options = cli.to_options();
        assert!(options.dry_run);
        assert!(!options.use_ffprobe);
        assert!(options.organize_images);
        assert!(!options.organize_videos);
        assert_eq!(options.threads, 4);
        assert!(cli.mode_given());
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut file = RunOptions::for_source("/from/config");
        file.dry_run = true;
        file.threads = 2;

        let merged = parse(&["--live"]).merge_with_config(file.clone());
        assert_eq!(merged.source_root, PathBuf::from("/from/config"));
        assert!(!merged.dry_run);
        assert_eq!(merged.threads, 2);

        let merged = parse(&["/other", "--no-images"]).merge_with_config(file);
        assert_eq!(merged.source_root, PathBuf::from("/other"));
        assert!(merged.dry_run);
        assert!(!merged.organize_images);
    }

    #[test]
    fn test_dry_run_conflicts_with_live() {
        let result = Cli::try_parse_from(["media-organizer", "--dry-run", "--live", "/a"]);
        assert!(result.is_err());
    }
}
