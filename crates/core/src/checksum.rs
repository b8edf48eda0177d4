//! File checksums.
//!
//! The engine treats checksums as opaque digests: it only ever compares them
//! for equality. Where a checksum has to be computed locally (checksum-archive
//! uploads, verifying bytes fetched from a reference replica) SHA-256 is used.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A lowercase hex digest of a file's contents.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum(String);

impl Checksum {
    /// Parse from a hex string. Case is normalised; surrounding whitespace is trimmed.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(crate::Error::InvalidChecksum(
                "checksum cannot be empty".to_string(),
            ));
        }
        if s.len() % 2 != 0 {
            return Err(crate::Error::InvalidChecksum(format!(
                "odd number of hex chars: {}",
                s.len()
            )));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidChecksum(format!(
                "not a hex string: {s}"
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Compute the SHA-256 checksum of data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Self::hasher();
        hasher.update(data);
        hasher.finalize()
    }

    /// Create an incremental hasher.
    pub fn hasher() -> ChecksumHasher {
        ChecksumHasher(Sha256::new())
    }

    /// Get the hex representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Checksum {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<Checksum> for String {
    fn from(value: Checksum) -> Self {
        value.0
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.0[..self.0.len().min(16)];
        write!(f, "Checksum({shown})")
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental SHA-256 hasher producing a [`Checksum`].
pub struct ChecksumHasher(Sha256);

impl ChecksumHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the checksum.
    pub fn finalize(self) -> Checksum {
        Checksum(hex::encode(self.0.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_known_digest() {
        let checksum = Checksum::compute(b"hello world");
        assert_eq!(
            checksum.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let mut hasher = Checksum::hasher();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finalize(), Checksum::compute(b"hello world"));
    }

    #[test]
    fn test_parse_normalises_case() {
        let upper = Checksum::parse(" ABCDEF01 ").unwrap();
        assert_eq!(upper.as_str(), "abcdef01");
        assert_eq!(upper, Checksum::parse("abcdef01").unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Checksum::parse("").is_err());
        assert!(Checksum::parse("abc").is_err());
        assert!(Checksum::parse("zz").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let ok: Checksum = serde_json::from_str("\"AA\"").unwrap();
        assert_eq!(ok.as_str(), "aa");
        assert!(serde_json::from_str::<Checksum>("\"not-hex\"").is_err());
    }
}
