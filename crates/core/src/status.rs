//! Per-file, per-replica status values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a file appeared in a replica's last file listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileListStatus {
    /// No completed listing covers this file on the replica.
    NoFilelistStatus,
    /// Known in admin data but absent from the replica's listing.
    Missing,
    /// Present in the replica's listing.
    Ok,
}

impl FileListStatus {
    /// Stable ordinal used in persisted and wire representations.
    pub fn ordinal(self) -> i64 {
        match self {
            Self::NoFilelistStatus => 0,
            Self::Missing => 1,
            Self::Ok => 2,
        }
    }

    /// Inverse of [`FileListStatus::ordinal`].
    pub fn from_ordinal(value: i64) -> crate::Result<Self> {
        match value {
            0 => Ok(Self::NoFilelistStatus),
            1 => Ok(Self::Missing),
            2 => Ok(Self::Ok),
            _ => Err(crate::Error::InvalidOrdinal {
                kind: "file list status",
                value,
            }),
        }
    }
}

/// Result of comparing a replica's checksum with the admin record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChecksumStatus {
    /// No completed checksum scan covers this file on the replica.
    Unknown,
    /// The replica's checksum differs from the admin record.
    Corrupt,
    /// The replica's checksum equals the admin record.
    Ok,
}

impl ChecksumStatus {
    /// Stable ordinal used in persisted and wire representations.
    pub fn ordinal(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Corrupt => 1,
            Self::Ok => 2,
        }
    }

    /// Inverse of [`ChecksumStatus::ordinal`].
    pub fn from_ordinal(value: i64) -> crate::Result<Self> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Corrupt),
            2 => Ok(Self::Ok),
            _ => Err(crate::Error::InvalidOrdinal {
                kind: "checksum status",
                value,
            }),
        }
    }
}

/// Upload acknowledgment recorded in admin data for a (file, replica) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicaStoreState {
    UploadStarted,
    DataUploaded,
    UploadCompleted,
    UploadFailed,
    UnknownUploadState,
}

impl ReplicaStoreState {
    /// All states, in ordinal order.
    pub const ALL: [Self; 5] = [
        Self::UploadStarted,
        Self::DataUploaded,
        Self::UploadCompleted,
        Self::UploadFailed,
        Self::UnknownUploadState,
    ];

    /// Get the persisted name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UploadStarted => "UPLOAD_STARTED",
            Self::DataUploaded => "DATA_UPLOADED",
            Self::UploadCompleted => "UPLOAD_COMPLETED",
            Self::UploadFailed => "UPLOAD_FAILED",
            Self::UnknownUploadState => "UNKNOWN_UPLOAD_STATE",
        }
    }

    /// Parse from the persisted name.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| crate::Error::InvalidState {
                kind: "replica store state",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for ReplicaStoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
