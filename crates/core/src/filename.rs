//! Archive filename validation.

use crate::CHECKSUM_SEPARATOR;

/// Maximum accepted filename length in bytes.
pub const MAX_FILENAME_LEN: usize = 255;

/// Validate an archive filename.
///
/// Archive files are stored flat on every replica, so names are single path
/// components. They also appear in line-oriented checksum listings, which rules
/// out whitespace and the listing separator.
pub fn validate_filename(name: &str) -> crate::Result<()> {
    if name.is_empty() {
        return Err(crate::Error::InvalidFilename(
            "filename cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_FILENAME_LEN {
        return Err(crate::Error::InvalidFilename(format!(
            "filename exceeds {MAX_FILENAME_LEN} bytes"
        )));
    }
    if name == "." || name == ".." || name.contains("..") {
        return Err(crate::Error::InvalidFilename(format!(
            "relative components not allowed: {name}"
        )));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(crate::Error::InvalidFilename(format!(
            "path separators not allowed: {name}"
        )));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(crate::Error::InvalidFilename(format!(
            "whitespace or control characters not allowed: {name:?}"
        )));
    }
    if name.contains(CHECKSUM_SEPARATOR) {
        return Err(crate::Error::InvalidFilename(format!(
            "'{CHECKSUM_SEPARATOR}' not allowed: {name}"
        )));
    }
    Ok(())
}
