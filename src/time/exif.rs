//! EXIF time extraction for images

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// EXIF tags to try for date extraction, in priority order
const DATE_TAGS: &[Tag] = &[
    Tag::DateTimeOriginal,  // When the original image was taken
    Tag::DateTimeDigitized, // When the image was digitized
];

/// Extract creation time from EXIF metadata
pub fn extract_exif_time(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            trace!(?path, error = %e, "No readable EXIF data");
            return None;
        }
    };

    for tag in DATE_TAGS {
        let Some(field) = exif.get_field(*tag, In::PRIMARY) else {
            continue;
        };
        // Read the ASCII payload directly; display_value() wraps it in quotes
        let raw = match &field.value {
            Value::Ascii(values) if !values.is_empty() => {
                String::from_utf8_lossy(&values[0]).into_owned()
            }
            _ => field.display_value().to_string(),
        };
        if let Some(datetime) = parse_exif_datetime(&raw) {
            trace!(?path, ?tag, "Found EXIF date");
            return Some(datetime);
        }
    }

    None
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"').trim_end_matches('\0');

    let formats = [
        "%Y:%m:%d %H:%M:%S",
        "%Y:%m:%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];

    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}
