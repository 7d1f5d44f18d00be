//! Content identity checks for duplicate detection
//!
//! Two files are identical when they have the same length and the same
//! BLAKE3 digest. Sizes are compared first so mismatched files are never read.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::trace;

/// Read buffer size used while hashing (256KB)
const BUFFER_SIZE: usize = 256 * 1024;

/// Compute the BLAKE3 digest of a file's full content, streaming it
pub fn file_digest(path: &Path) -> Result<[u8; 32]> {
    let file = File::open(path).map_err(|e| unreadable(path, e))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = blake3::Hasher::new();

    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buffer).map_err(|e| unreadable(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let digest = *hasher.finalize().as_bytes();
    trace!(?path, digest = %blake3::Hash::from(digest).to_hex(), "Computed file digest");
    Ok(digest)
}

/// Whether two files have byte-identical content
///
/// I/O failures (a file vanished, is locked or is still being written) are
/// returned as errors and never reported as "not identical".
pub fn identical(a: &Path, b: &Path) -> Result<bool> {
    let size_a = fs::metadata(a).map_err(|e| unreadable(a, e))?.len();
    let size_b = fs::metadata(b).map_err(|e| unreadable(b, e))?.len();
    if size_a != size_b {
        trace!(?a, ?b, size_a, size_b, "Sizes differ");
        return Ok(false);
    }

    Ok(file_digest(a)? == file_digest(b)?)
}

fn unreadable(path: &Path, source: std::io::Error) -> Error {
    Error::Unreadable {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_with(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_digest_is_content_based() {
        let file1 = temp_with(b"test content");
        let file2 = temp_with(b"test content");
        let file3 = temp_with(b"test contenT");

        let d1 = file_digest(file1.path()).unwrap();
        assert_eq!(d1, file_digest(file2.path()).unwrap());
        assert_ne!(d1, file_digest(file3.path()).unwrap());
        assert_eq!(d1, *blake3::hash(b"test content").as_bytes());
    }

    #[test]
    fn test_identical_same_content() {
        let big = vec![7u8; BUFFER_SIZE * 2 + 13];
        let file1 = temp_with(&big);
        let file2 = temp_with(&big);
        assert!(identical(file1.path(), file2.path()).unwrap());
    }

    #[test]
    fn test_identical_same_size_different_content() {
        let file1 = temp_with(b"aaaa");
        let file2 = temp_with(b"aaab");
        assert!(!identical(file1.path(), file2.path()).unwrap());
    }

    #[test]
    fn test_identical_different_size() {
        let file1 = temp_with(b"short");
        let file2 = temp_with(b"much longer");
        assert!(!identical(file1.path(), file2.path()).unwrap());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let file1 = temp_with(b"x");
        let err = identical(file1.path(), Path::new("/no/such/file.jpg")).unwrap_err();
        assert!(matches!(err, Error::Unreadable { .. }));
        assert!(err.to_string().contains("file.jpg"));
    }
}
