//! The authoritative per-file admin record.

use crate::checksum::Checksum;
use crate::replica::ReplicaId;
use crate::status::ReplicaStoreState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// What admin data says should exist for one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub filename: String,
    /// Expected checksum of the file's contents.
    pub checksum: Checksum,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    /// Acknowledged upload state per replica. Replicas without an entry have
    /// never been asked to store the file.
    pub replica_states: BTreeMap<ReplicaId, ReplicaStoreState>,
}

impl AdminRecord {
    /// Create a record with no replica acknowledgments.
    pub fn new(
        filename: impl Into<String>,
        checksum: Checksum,
        uploaded_at: OffsetDateTime,
    ) -> crate::Result<Self> {
        let filename = filename.into();
        crate::validate_filename(&filename)?;
        Ok(Self {
            filename,
            checksum,
            uploaded_at,
            replica_states: BTreeMap::new(),
        })
    }

    /// Acknowledged state for a replica, if any.
    pub fn state_for(&self, replica: &ReplicaId) -> Option<ReplicaStoreState> {
        self.replica_states.get(replica).copied()
    }

    /// Builder-style helper to set a replica's state.
    pub fn with_state(mut self, replica: ReplicaId, state: ReplicaStoreState) -> Self {
        self.replica_states.insert(replica, state);
        self
    }
}
