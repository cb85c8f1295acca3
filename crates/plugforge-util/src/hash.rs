//! Hashing utilities for deterministic cache key computation.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::UtilError;

/// Compute the SHA-256 hex digest of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 hex digest of a file using streaming reads.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, UtilError> {
    let file = std::fs::File::open(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = std::io::Read::read(&mut reader, &mut buf).map_err(|source| UtilError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if n == 0 {
            break;
        }
        let Some(chunk) = buf.get(..n) else {
            break; // unreachable: n is bounded by buf.len()
        };
        hasher.update(chunk);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Combine multiple string parts into a single composite SHA-256 hash.
///
/// Each part is hashed in order with a length prefix to prevent ambiguity.
pub fn sha256_multi(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        // Length-prefix each part to avoid collisions like ["ab","c"] vs ["a","bc"].
        let len_bytes = part.len().to_le_bytes();
        hasher.update(len_bytes);
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn sha256_bytes_deterministic() {
        let a = sha256_bytes(b"hello");
        let b = sha256_bytes(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // 256 bits = 64 hex chars
    }

    #[test]
    fn sha256_bytes_different_input() {
        let a = sha256_bytes(b"hello");
        let b = sha256_bytes(b"world");
        assert_ne!(a, b);
    }

    #[test]
    fn sha256_file_reads_correctly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.txt");
        fs::write(&file, b"file content").unwrap();

        let hash = sha256_file(&file).unwrap();
        let expected = sha256_bytes(b"file content");
        assert_eq!(hash, expected);
    }

    #[test]
    fn sha256_file_missing() {
        let result = sha256_file(Path::new("/nonexistent/path/file.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn sha256_multi_deterministic() {
        let a = sha256_multi(&["hello", "world"]);
        let b = sha256_multi(&["hello", "world"]);
        assert_eq!(a, b);
    }

    #[test]
    fn sha256_multi_order_matters() {
        let a = sha256_multi(&["hello", "world"]);
        let b = sha256_multi(&["world", "hello"]);
        assert_ne!(a, b);
    }

    #[test]
    fn sha256_multi_no_boundary_collision() {
        // ["ab", "c"] and ["a", "bc"] must produce different hashes
        let a = sha256_multi(&["ab", "c"]);
        let b = sha256_multi(&["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn sha256_multi_empty_parts() {
        let hash = sha256_multi(&[]);
        assert_eq!(hash.len(), 64);
    }
}
