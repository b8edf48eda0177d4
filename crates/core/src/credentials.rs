//! Operator credentials for destructive repair operations.

use sha2::{Digest, Sha256};
use std::fmt;

/// An opaque capability token presented when a repair has to remove a file.
///
/// The engine never interprets credentials; it hands them to the storage
/// collaborator, which compares their hash against its configured value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    /// Wrap a credential string.
    pub fn new(value: impl Into<String>) -> crate::Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(crate::Error::InvalidCredentials(
                "credentials cannot be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// SHA-256 hex digest of the credential.
    pub fn hash(&self) -> String {
        hash_secret(&self.0)
    }

    /// Check the credential against a configured SHA-256 hex digest.
    pub fn matches_hash(&self, expected_hash: &str) -> bool {
        self.hash().eq_ignore_ascii_case(expected_hash.trim())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credentials").field(&"<redacted>").finish()
    }
}

/// SHA-256 hex digest of a secret, as stored in configuration.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check that a configured secret hash looks like a SHA-256 hex digest.
pub fn is_valid_secret_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit())
}
