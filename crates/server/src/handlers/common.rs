//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use bitpres_core::ReplicaId;
use serde::Deserialize;

/// Parse a replica id from a path segment.
pub fn parse_replica_id(raw: &str) -> ApiResult<ReplicaId> {
    ReplicaId::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Request body naming a set of files.
#[derive(Debug, Deserialize)]
pub struct FilenamesRequest {
    pub filenames: Vec<String>,
}

impl FilenamesRequest {
    pub fn require_some(&self) -> ApiResult<&[String]> {
        if self.filenames.is_empty() {
            return Err(ApiError::BadRequest("filenames cannot be empty".to_string()));
        }
        Ok(&self.filenames)
    }
}
