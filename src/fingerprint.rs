//! Content fingerprints: lowercase hex SHA-256.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

pub fn fingerprint_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Fingerprint of a file on disk, or `None` when it does not exist.
pub fn fingerprint_file(path: &Path) -> io::Result<Option<String>> {
    match fs::read(path) {
        Ok(content) => Ok(Some(fingerprint_bytes(&content))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
