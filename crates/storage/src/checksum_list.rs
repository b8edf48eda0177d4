//! The checksum listing kept by checksum-archive replicas.
//!
//! A checksum archive stores no file bytes. Its whole content is a single
//! `checksum.list` object with one `filename##checksum` line per file.

use crate::error::{StorageError, StorageResult};
use crate::traits::ArchiveStore;
use bitpres_core::{CHECKSUM_SEPARATOR, Checksum, validate_filename};
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::collections::btree_map::Entry;

/// Object key of the listing inside a checksum archive.
pub const CHECKSUM_LIST_KEY: &str = "checksum.list";

/// Parsed checksum listing, ordered by filename.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChecksumListing {
    entries: BTreeMap<String, Checksum>,
}

impl ChecksumListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse listing text. Blank lines are skipped.
    ///
    /// A filename listed twice with the same checksum is accepted; listed
    /// twice with different checksums it is rejected.
    pub fn parse(text: &str) -> StorageResult<Self> {
        let mut entries = BTreeMap::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let lineno = index + 1;
            let (filename, checksum) = parse_line(line).map_err(|(_, reason)| {
                StorageError::InvalidListing(format!("line {lineno}: {reason}"))
            })?;

            match entries.entry(filename.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(checksum);
                }
                Entry::Occupied(existing) if *existing.get() == checksum => {}
                Entry::Occupied(_) => {
                    return Err(StorageError::InvalidListing(format!(
                        "line {lineno}: conflicting checksums for {filename}"
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Parse raw listing bytes, keeping every usable line.
    ///
    /// Unusable lines are reported instead of failing the whole listing. A
    /// filename with any unusable or conflicting line is left out of the
    /// listing and reported as rejected.
    pub fn scan(data: &[u8]) -> ScannedListing {
        let mut entries: BTreeMap<String, Checksum> = BTreeMap::new();
        let mut rejected = Vec::new();
        for (index, raw) in data.split(|b| *b == b'\n').enumerate() {
            let line = index + 1;
            let text = match std::str::from_utf8(raw) {
                Ok(text) => text.trim(),
                Err(_) => {
                    rejected.push(RejectedLine {
                        line,
                        filename: None,
                        reason: "not valid UTF-8".to_string(),
                    });
                    continue;
                }
            };
            if text.is_empty() {
                continue;
            }
            match parse_line(text) {
                Ok((filename, checksum)) => match entries.entry(filename.to_string()) {
                    Entry::Vacant(slot) => {
                        slot.insert(checksum);
                    }
                    Entry::Occupied(existing) if *existing.get() == checksum => {}
                    Entry::Occupied(_) => rejected.push(RejectedLine {
                        line,
                        filename: Some(filename.to_string()),
                        reason: format!("conflicting checksums for {filename}"),
                    }),
                },
                Err((filename, reason)) => rejected.push(RejectedLine {
                    line,
                    filename: filename.map(str::to_string),
                    reason,
                }),
            }
        }

        for filename in rejected.iter().filter_map(|r| r.filename.as_deref()) {
            entries.remove(filename);
        }
        ScannedListing {
            listing: Self { entries },
            rejected,
        }
    }

    /// Render the listing, one line per file.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (filename, checksum) in &self.entries {
            out.push_str(filename);
            out.push_str(CHECKSUM_SEPARATOR);
            out.push_str(checksum.as_str());
            out.push('\n');
        }
        out
    }

    /// Load the listing from a store. A store without a listing is empty.
    pub async fn load(store: &dyn ArchiveStore) -> StorageResult<Self> {
        match store.get(CHECKSUM_LIST_KEY).await {
            Ok(data) => {
                let text = std::str::from_utf8(&data).map_err(|e| {
                    StorageError::InvalidListing(format!("listing is not UTF-8: {e}"))
                })?;
                Self::parse(text)
            }
            Err(StorageError::NotFound(_)) => Ok(Self::new()),
            Err(e) => Err(e),
        }
    }

    /// Load the listing for a scan, tolerating unusable lines.
    pub async fn load_for_scan(store: &dyn ArchiveStore) -> StorageResult<ScannedListing> {
        match store.get(CHECKSUM_LIST_KEY).await {
            Ok(data) => Ok(Self::scan(&data)),
            Err(StorageError::NotFound(_)) => Ok(ScannedListing::default()),
            Err(e) => Err(e),
        }
    }

    /// Atomically replace the listing in a store.
    pub async fn save(&self, store: &dyn ArchiveStore) -> StorageResult<()> {
        store
            .put(CHECKSUM_LIST_KEY, Bytes::from(self.to_text()))
            .await
    }

    pub fn get(&self, filename: &str) -> Option<&Checksum> {
        self.entries.get(filename)
    }

    /// Insert an entry, returning false if the filename was already listed.
    pub fn insert(&mut self, filename: &str, checksum: Checksum) -> bool {
        match self.entries.entry(filename.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(checksum);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn remove(&mut self, filename: &str) -> Option<Checksum> {
        self.entries.remove(filename)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Checksum)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split one non-blank line into filename and checksum.
///
/// On failure, returns the filename when the line names a valid one.
fn parse_line(line: &str) -> Result<(&str, Checksum), (Option<&str>, String)> {
    let Some((filename, checksum)) = line.split_once(CHECKSUM_SEPARATOR) else {
        return Err((None, "missing separator".to_string()));
    };
    if let Err(e) = validate_filename(filename) {
        return Err((None, e.to_string()));
    }
    match Checksum::parse(checksum) {
        Ok(checksum) => Ok((filename, checksum)),
        Err(e) => Err((Some(filename), e.to_string())),
    }
}

/// A listing line that could not be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based line number.
    pub line: usize,
    pub filename: Option<String>,
    pub reason: String,
}

/// A listing read for a scan: the usable entries and the rejected lines.
#[derive(Clone, Debug, Default)]
pub struct ScannedListing {
    pub listing: ChecksumListing,
    pub rejected: Vec<RejectedLine>,
}

impl ScannedListing {
    /// Filenames named by rejected lines.
    pub fn rejected_files(&self) -> BTreeSet<String> {
        self.rejected
            .iter()
            .filter_map(|r| r.filename.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::filesystem::FilesystemBackend;

    const A: &str = "aaaa0000aaaa0000aaaa0000aaaa0000aaaa0000aaaa0000aaaa0000aaaa0000";
    const B: &str = "bbbb1111bbbb1111bbbb1111bbbb1111bbbb1111bbbb1111bbbb1111bbbb1111";

    #[test]
    fn test_parse_skips_blank_lines_and_normalises_case() {
        let text = format!("\na.arc##{A}\n\n  b.arc##{}  \n", B.to_uppercase());
        let listing = ChecksumListing::parse(&text).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.get("a.arc").unwrap().as_str(), A);
        assert_eq!(listing.get("b.arc").unwrap().as_str(), B);
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        for text in [
            "a.arc".to_string(),
            format!("a.arc#{A}"),
            "a.arc##not-hex".to_string(),
            format!("##{A}"),
            format!("../a.arc##{A}"),
        ] {
            assert!(
                matches!(
                    ChecksumListing::parse(&text),
                    Err(StorageError::InvalidListing(_))
                ),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_duplicates() {
        let same = format!("a.arc##{A}\na.arc##{A}\n");
        assert_eq!(ChecksumListing::parse(&same).unwrap().len(), 1);

        let conflicting = format!("a.arc##{A}\na.arc##{B}\n");
        assert!(ChecksumListing::parse(&conflicting).is_err());
    }

    #[test]
    fn test_scan_keeps_good_lines() {
        let text = format!(
            "a.arc##{A}\nbroken line without separator\nc.arc##not-hex\n\
             d.arc##{A}\nd.arc##{B}\n../e.arc##{A}\n"
        );
        let scanned = ChecksumListing::scan(text.as_bytes());

        assert_eq!(scanned.listing.len(), 1);
        assert_eq!(scanned.listing.get("a.arc").unwrap().as_str(), A);
        let lines: Vec<usize> = scanned.rejected.iter().map(|r| r.line).collect();
        assert_eq!(lines, [2, 3, 5, 6]);
        assert_eq!(
            scanned.rejected_files(),
            BTreeSet::from(["c.arc".to_string(), "d.arc".to_string()])
        );
    }

    #[test]
    fn test_scan_rejects_non_utf8_line() {
        let mut data = format!("a.arc##{A}\n").into_bytes();
        data.extend_from_slice(b"\xff\xfe.arc##");
        data.extend_from_slice(B.as_bytes());

        let scanned = ChecksumListing::scan(&data);
        assert_eq!(scanned.listing.len(), 1);
        assert_eq!(scanned.rejected.len(), 1);
        assert_eq!(scanned.rejected[0].line, 2);
        assert!(scanned.rejected[0].filename.is_none());
    }

    #[test]
    fn test_to_text_is_sorted_and_parseable() {
        let mut listing = ChecksumListing::new();
        assert!(listing.insert("b.arc", Checksum::parse(B).unwrap()));
        assert!(listing.insert("a.arc", Checksum::parse(A).unwrap()));
        assert!(!listing.insert("a.arc", Checksum::parse(B).unwrap()));

        let text = listing.to_text();
        assert_eq!(text, format!("a.arc##{A}\nb.arc##{B}\n"));
        assert_eq!(ChecksumListing::parse(&text).unwrap(), listing);
    }

    #[tokio::test]
    async fn test_load_missing_listing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBackend::new(dir.path()).await.unwrap();

        let listing = ChecksumListing::load(&store).await.unwrap();
        assert!(listing.is_empty());

        let mut listing = listing;
        listing.insert("a.arc", Checksum::parse(A).unwrap());
        listing.save(&store).await.unwrap();

        let reloaded = ChecksumListing::load(&store).await.unwrap();
        assert_eq!(reloaded.get("a.arc").unwrap().as_str(), A);
    }

    #[tokio::test]
    async fn test_load_for_scan_tolerates_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBackend::new(dir.path()).await.unwrap();
        assert!(ChecksumListing::load_for_scan(&store).await.unwrap().listing.is_empty());

        let text = format!("a.arc##{A}\ngarbage\n");
        store.put(CHECKSUM_LIST_KEY, Bytes::from(text)).await.unwrap();

        assert!(ChecksumListing::load(&store).await.is_err());
        let scanned = ChecksumListing::load_for_scan(&store).await.unwrap();
        assert_eq!(scanned.listing.len(), 1);
        assert_eq!(scanned.rejected.len(), 1);
    }
}
