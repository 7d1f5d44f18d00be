//! Capture date resolution
//!
//! This module provides functionality to find when a media file was created:
//! - EXIF metadata in images (JPEG, TIFF, HEIC, RAW formats)
//! - Movie header metadata in QuickTime/MP4 containers
//! - Container metadata via FFprobe for other video formats
//! - File system modification time, used by callers as the last resort

pub mod exif;
pub mod video;

use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// Source of a resolved timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Read from the file's embedded metadata
    Metadata,
    /// From file system modification time
    FileSystem,
}

/// A timestamp together with where it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    /// Local wall-clock time
    pub timestamp: NaiveDateTime,
    pub source: TimeSource,
}

/// Reads an original creation time out of a media file
///
/// Implementations absorb every failure (unreadable file, unsupported
/// container, malformed tags) and report it as `None`. Timestamps are local
/// wall-clock time.
pub trait MetadataProbe: Send + Sync {
    fn extract_date(&self, path: &Path) -> Option<NaiveDateTime>;
}

impl<F> MetadataProbe for F
where
    F: Fn(&Path) -> Option<NaiveDateTime> + Send + Sync,
{
    fn extract_date(&self, path: &Path) -> Option<NaiveDateTime> {
        self(path)
    }
}

/// Default probe backed by EXIF, movie headers and FFprobe
#[derive(Debug, Clone)]
pub struct MediaMetadataProbe {
    /// Ask FFprobe about containers without a native parser
    pub use_ffprobe: bool,
}

impl Default for MediaMetadataProbe {
    fn default() -> Self {
        Self { use_ffprobe: true }
    }
}

impl MetadataProbe for MediaMetadataProbe {
    fn extract_date(&self, path: &Path) -> Option<NaiveDateTime> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "mp4" | "mov" | "m4v" | "3gp" => video::extract_movie_header_time(path)
                .or_else(|| self.ffprobe(path)),
            "avi" | "mkv" | "wmv" | "webm" | "mts" | "m2ts" => self.ffprobe(path),
            _ => exif::extract_exif_time(path),
        }
    }
}

impl MediaMetadataProbe {
    fn ffprobe(&self, path: &Path) -> Option<NaiveDateTime> {
        if self.use_ffprobe {
            video::extract_ffprobe_time(path)
        } else {
            None
        }
    }
}

/// Best-effort metadata date lookup
///
/// Wraps a [`MetadataProbe`] and never fails; the modification-time fallback
/// is left to the caller.
#[derive(Clone)]
pub struct DateResolver {
    probe: Arc<dyn MetadataProbe>,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(Arc::new(MediaMetadataProbe::default()))
    }
}

impl std::fmt::Debug for DateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateResolver").finish_non_exhaustive()
    }
}

impl DateResolver {
    pub fn new(probe: Arc<dyn MetadataProbe>) -> Self {
        Self { probe }
    }

    /// Embedded creation time of the file, if any can be read
    pub fn resolve_date(&self, path: &Path) -> Option<NaiveDateTime> {
        let date = self.probe.extract_date(path);
        match date {
            Some(ts) => debug!(?path, timestamp = %ts, "Resolved date from metadata"),
            None => trace!(?path, "No metadata date"),
        }
        date
    }
}

/// File system modification time as local wall-clock time
pub fn modified_time(path: &Path) -> std::io::Result<NaiveDateTime> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_closure_probe() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 4)
            .unwrap()
            .and_hms_opt(3, 2, 1)
            .unwrap();
        let resolver = DateResolver::new(Arc::new(move |_: &Path| Some(date)));
        assert_eq!(resolver.resolve_date(Path::new("any.jpg")), Some(date));
    }

    #[test]
    fn test_default_probe_absorbs_garbage() {
        let mut file = NamedTempFile::with_suffix(".jpg").unwrap();
        file.write_all(b"definitely not a jpeg").unwrap();
        file.flush().unwrap();

        let resolver = DateResolver::default();
        assert_eq!(resolver.resolve_date(file.path()), None);
        assert_eq!(resolver.resolve_date(Path::new("/no/such/file.mp4")), None);
    }

    #[test]
    fn test_modified_time_matches_filetime() {
        let file = NamedTempFile::new().unwrap();
        let local = NaiveDate::from_ymd_opt(2019, 11, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .unwrap();
        filetime::set_file_mtime(
            file.path(),
            filetime::FileTime::from_unix_time(local.timestamp(), 0),
        )
        .unwrap();

        assert_eq!(modified_time(file.path()).unwrap(), local.naive_local());
    }
}
