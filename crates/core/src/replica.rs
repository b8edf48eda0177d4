//! Replica identities and the configured replica registry.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Maximum length of a replica id.
const MAX_REPLICA_ID_LEN: usize = 64;

/// Identity of a replica, e.g. `"SB"` or `"KB-bitarchive"`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Parse and validate a replica id.
    pub fn parse(s: &str) -> crate::Result<Self> {
        if s.is_empty() {
            return Err(crate::Error::InvalidReplicaId(
                "replica id cannot be empty".to_string(),
            ));
        }
        if s.len() > MAX_REPLICA_ID_LEN {
            return Err(crate::Error::InvalidReplicaId(format!(
                "replica id exceeds {MAX_REPLICA_ID_LEN} chars: {s}"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(crate::Error::InvalidReplicaId(format!(
                "replica id may only contain [A-Za-z0-9_-]: {s}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReplicaId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<ReplicaId> for String {
    fn from(value: ReplicaId) -> Self {
        value.0
    }
}

impl fmt::Debug for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReplicaId({})", self.0)
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a replica stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicaKind {
    /// Stores raw file bytes and can run batch jobs over them.
    #[serde(rename = "bitarchive")]
    BitArchive,
    /// Stores only a checksum per file.
    #[serde(rename = "checksum")]
    ChecksumArchive,
}

impl ReplicaKind {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BitArchive => "bitarchive",
            Self::ChecksumArchive => "checksum",
        }
    }

    /// Whether replicas of this kind hold file bytes that can seed a repair.
    pub fn holds_bytes(&self) -> bool {
        matches!(self, Self::BitArchive)
    }
}

impl fmt::Display for ReplicaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered replica. Immutable once registered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    pub id: ReplicaId,
    pub name: String,
    pub kind: ReplicaKind,
}

impl Replica {
    pub fn new(id: ReplicaId, name: impl Into<String>, kind: ReplicaKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }
}

/// The process-wide catalogue of known replicas.
///
/// Registration order is the reference priority order: when a repair needs a
/// source copy, earlier bit-archive replicas are preferred over later ones.
#[derive(Clone, Debug)]
pub struct ReplicaRegistry {
    replicas: Vec<Replica>,
}

impl ReplicaRegistry {
    /// Build a registry, rejecting empty or duplicate configurations.
    pub fn new(replicas: Vec<Replica>) -> crate::Result<Self> {
        if replicas.is_empty() {
            return Err(crate::Error::InvalidRegistry(
                "at least one replica must be configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for replica in &replicas {
            if !seen.insert(&replica.id) {
                return Err(crate::Error::InvalidRegistry(format!(
                    "duplicate replica id: {}",
                    replica.id
                )));
            }
        }
        Ok(Self { replicas })
    }

    /// All replicas in priority order.
    pub fn list(&self) -> &[Replica] {
        &self.replicas
    }

    /// Look up a replica by id.
    pub fn get(&self, id: &ReplicaId) -> crate::Result<&Replica> {
        self.replicas
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| crate::Error::UnknownReplica(id.to_string()))
    }

    /// Check whether a replica id is registered.
    pub fn contains(&self, id: &ReplicaId) -> bool {
        self.replicas.iter().any(|r| &r.id == id)
    }

    /// Candidate repair sources for `id`: every other bit-archive replica, in priority order.
    pub fn reference_candidates<'a>(
        &'a self,
        id: &'a ReplicaId,
    ) -> impl Iterator<Item = &'a Replica> + 'a {
        self.replicas
            .iter()
            .filter(move |r| &r.id != id && r.kind.holds_bytes())
    }

    /// The preferred repair source for `id`, if any replica qualifies.
    pub fn reference_replica_for(&self, id: &ReplicaId) -> Option<&Replica> {
        self.replicas
            .iter()
            .find(|r| &r.id != id && r.kind.holds_bytes())
    }
}
