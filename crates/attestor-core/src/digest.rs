//! The `Fingerprint` type and the SHA-256 helpers every hasher shares.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{FingerprintError, Result};

/// Number of hex characters in a SHA-256 fingerprint.
pub const FINGERPRINT_LEN: usize = 64;

/// A lowercase hex SHA-256 digest identifying an artifact's content.
///
/// The only ways to build one are hashing bytes or parsing a string that
/// already has the `^[0-9a-f]{64}$` shape, so a `Fingerprint` is always
/// well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_digest(digest: impl AsRef<[u8]>) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses an engine or registry digest that may carry an algorithm prefix.
    pub fn from_prefixed(value: &str) -> Result<Self> {
        let bare = value.trim();
        let bare = bare.strip_prefix("sha256:").unwrap_or(bare);
        validate_fingerprint(bare)
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(value: &str) -> Result<Self> {
        validate_fingerprint(value)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Checks a user-supplied fingerprint against the `^[0-9a-f]{64}$` shape.
pub fn validate_fingerprint(value: &str) -> Result<Fingerprint> {
    let well_formed = value.len() == FINGERPRINT_LEN
        && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));

    if !well_formed {
        return Err(FingerprintError::validation(format!(
            "'{value}' is not a valid SHA-256 fingerprint: expected {FINGERPRINT_LEN} lowercase hex characters"
        )));
    }

    Ok(Fingerprint(value.to_string()))
}

pub fn sha256_bytes(bytes: impl AsRef<[u8]>) -> Fingerprint {
    Fingerprint::from_digest(Sha256::digest(bytes.as_ref()))
}

/// Streams `path` through SHA-256 without loading it into memory.
pub fn sha256_file(path: &Path) -> Result<Fingerprint> {
    let mut file =
        File::open(path).map_err(|e| FingerprintError::from_io(path, "file", e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| FingerprintError::from_io(path, "file", e))?;
    Ok(Fingerprint::from_digest(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn accepts_well_formed_digest() {
        let fp = validate_fingerprint(EMPTY_SHA256).expect("valid digest");
        assert_eq!(fp.as_str(), EMPTY_SHA256);
    }

    #[test]
    fn rejects_malformed_digests() {
        // 65 characters
        assert!(validate_fingerprint(
            "8b4fd747df6882b897aa514af7b40571a7508cc78a8d48ae2c12f9f4bcb1598f0"
        )
        .is_err());
        assert!(validate_fingerprint("12345").is_err());
        assert!(validate_fingerprint(&EMPTY_SHA256.to_uppercase()).is_err());
        assert!(validate_fingerprint("").is_err());

        let err = validate_fingerprint("12345").unwrap_err();
        assert!(matches!(err, FingerprintError::Validation(_)));
        assert!(err.to_string().contains("12345"));
    }

    #[test]
    fn strips_algorithm_prefix() {
        let fp = Fingerprint::from_prefixed(&format!("sha256:{EMPTY_SHA256}\n")).unwrap();
        assert_eq!(fp.as_str(), EMPTY_SHA256);
    }

    #[test]
    fn file_digest_matches_byte_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("FILE.tgz");
        std::fs::write(&path, b"some known bytes").unwrap();

        assert_eq!(sha256_file(&path).unwrap(), sha256_bytes(b"some known bytes"));
        assert_eq!(sha256_bytes(b"").as_str(), EMPTY_SHA256);
    }
}
