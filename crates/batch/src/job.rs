//! Batch job requests.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// What a batch job does on the replica.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchOperation {
    /// List the files the replica holds (FIND_MISSING).
    ListFiles,
    /// Compute or report a checksum for every file (CHECKSUM_ALL).
    ChecksumAll,
}

impl BatchOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListFiles => "list_files",
            Self::ChecksumAll => "checksum_all",
        }
    }
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which filenames a job applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilenameFilter {
    All,
    Names(BTreeSet<String>),
    Prefix(String),
}

impl FilenameFilter {
    pub fn matches(&self, filename: &str) -> bool {
        match self {
            Self::All => true,
            Self::Names(names) => names.contains(filename),
            Self::Prefix(prefix) => filename.starts_with(prefix.as_str()),
        }
    }
}

/// One unit of work for one replica.
#[derive(Clone, Debug)]
pub struct BatchJob {
    /// Correlation id; the response carries it back.
    pub id: Uuid,
    pub operation: BatchOperation,
    pub filter: FilenameFilter,
    /// How long the dispatcher waits for the response.
    pub timeout: Duration,
}

impl BatchJob {
    /// Create a job with a fresh correlation id.
    pub fn new(operation: BatchOperation, filter: FilenameFilter, timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            filter,
            timeout,
        }
    }

    pub fn list_files(filter: FilenameFilter, timeout: Duration) -> Self {
        Self::new(BatchOperation::ListFiles, filter, timeout)
    }

    pub fn checksum_all(filter: FilenameFilter, timeout: Duration) -> Self {
        Self::new(BatchOperation::ChecksumAll, filter, timeout)
    }
}
