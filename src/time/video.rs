//! Video creation time extraction
//!
//! QuickTime and ISO-BMFF containers (MP4, MOV, M4V) are read natively from
//! the `moov/mvhd` movie header. Other containers go through FFprobe when it
//! is installed. Both sources store UTC, which is converted to local time.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Seconds between 1904-01-01 (QuickTime epoch) and 1970-01-01
const QT_TO_UNIX_OFFSET: i64 = 2_082_844_800;

/// Metadata keys to try for creation date
const CREATION_DATE_KEYS: &[&str] = &[
    "creation_time",
    "com.apple.quicktime.creationdate",
    "date",
    "date_recorded",
];

/// Cached FFprobe availability check
static FFPROBE_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Check if ffprobe is available (cached)
fn is_ffprobe_available() -> bool {
    *FFPROBE_AVAILABLE.get_or_init(|| Command::new("ffprobe").arg("-version").output().is_ok())
}

#[derive(Debug, Clone, Copy)]
struct AtomRange {
    data_start: u64,
    data_end: u64,
}

/// Read the movie header creation time of a QuickTime/MP4 file
pub fn extract_movie_header_time(path: &Path) -> Option<NaiveDateTime> {
    let mut file = File::open(path).ok()?;
    let file_len = file.metadata().ok()?.len();
    let moov = find_atom(&mut file, 0, file_len, *b"moov")?;
    let mvhd = find_atom(&mut file, moov.data_start, moov.data_end, *b"mvhd")?;
    let qt_seconds = read_mvhd_creation_time(&mut file, mvhd)?;

    // Zero means the muxer never filled the field in
    if qt_seconds == 0 {
        trace!(?path, "Movie header has no creation time");
        return None;
    }

    let local = qt_seconds_to_local(qt_seconds)?;
    debug!(?path, timestamp = %local, "Found movie header creation time");
    Some(local)
}

fn find_atom(file: &mut File, start: u64, end: u64, atom_type: [u8; 4]) -> Option<AtomRange> {
    let mut offset = start;
    while offset + 8 <= end {
        file.seek(SeekFrom::Start(offset)).ok()?;
        let mut header = [0u8; 8];
        file.read_exact(&mut header).ok()?;
        let mut atom_size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let atom_kind = [header[4], header[5], header[6], header[7]];
        let mut header_size = 8u64;

        if atom_size == 1 {
            let mut large = [0u8; 8];
            file.read_exact(&mut large).ok()?;
            atom_size = u64::from_be_bytes(large);
            header_size = 16;
        } else if atom_size == 0 {
            // Atom extends to the end of its parent
            atom_size = end.saturating_sub(offset);
        }
        if atom_size < header_size {
            return None;
        }
        let atom_end = offset.saturating_add(atom_size).min(end);

        if atom_kind == atom_type {
            return Some(AtomRange {
                data_start: offset + header_size,
                data_end: atom_end,
            });
        }
        offset = atom_end;
    }
    None
}

fn read_mvhd_creation_time(file: &mut File, mvhd: AtomRange) -> Option<u64> {
    file.seek(SeekFrom::Start(mvhd.data_start)).ok()?;
    let mut version_flags = [0u8; 4];
    file.read_exact(&mut version_flags).ok()?;

    if version_flags[0] == 1 {
        let mut buf = [0u8; 8];
        file.read_exact(&mut buf).ok()?;
        Some(u64::from_be_bytes(buf))
    } else {
        let mut buf = [0u8; 4];
        file.read_exact(&mut buf).ok()?;
        Some(u32::from_be_bytes(buf) as u64)
    }
}

fn qt_seconds_to_local(qt_seconds: u64) -> Option<NaiveDateTime> {
    let unix = i64::try_from(qt_seconds).ok()?.checked_sub(QT_TO_UNIX_OFFSET)?;
    let utc = Utc.timestamp_opt(unix, 0).single()?;
    Some(utc.with_timezone(&Local).naive_local())
}

/// Extract creation time from container metadata using FFprobe
pub fn extract_ffprobe_time(path: &Path) -> Option<NaiveDateTime> {
    if !is_ffprobe_available() {
        return None;
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        trace!(?path, "FFprobe failed");
        return None;
    }

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
    let utc = creation_time_from_probe(&json)?;
    let local = utc.with_timezone(&Local).naive_local();
    debug!(?path, timestamp = %local, "Found FFprobe creation time");
    Some(local)
}

/// Look for a creation time in FFprobe's format tags, then in stream tags
fn creation_time_from_probe(json: &serde_json::Value) -> Option<DateTime<Utc>> {
    let format_tags = json.get("format").and_then(|f| f.get("tags"));
    let stream_tags = json
        .get("streams")
        .and_then(|s| s.as_array())
        .into_iter()
        .flatten()
        .filter_map(|stream| stream.get("tags"));

    format_tags.into_iter().chain(stream_tags).find_map(|tags| {
        CREATION_DATE_KEYS.iter().find_map(|key| {
            [key.to_string(), key.to_uppercase()]
                .iter()
                .filter_map(|k| tags.get(k.as_str()).and_then(|v| v.as_str()))
                .find_map(parse_video_datetime)
        })
    })
}

/// Parse a container timestamp; values without an offset are taken as UTC
fn parse_video_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}
