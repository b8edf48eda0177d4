//! Replica repairs.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{FilenamesRequest, parse_replica_id};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use bitpres_core::Credentials;
use bitpres_engine::RepairReport;
use serde::Deserialize;

/// POST /v1/replicas/{id}/missing/upload
pub async fn upload_missing_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<FilenamesRequest>,
) -> ApiResult<Json<RepairReport>> {
    let replica = parse_replica_id(&id)?;
    let report = state
        .engine
        .upload_missing_files(&replica, req.require_some()?)
        .await?;
    Ok(Json(report))
}

/// Request to replace a corrupt copy.
#[derive(Debug, Deserialize)]
pub struct ReplaceRequest {
    pub filename: String,
    /// Secret the replica checks before removing its copy.
    pub credentials: String,
    /// The corrupt checksum the operator observed on the replica.
    pub checksum: String,
}

/// POST /v1/replicas/{id}/changed/replace
pub async fn replace_changed_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReplaceRequest>,
) -> ApiResult<Json<RepairReport>> {
    let replica = parse_replica_id(&id)?;
    let credentials =
        Credentials::new(req.credentials).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let report = state
        .engine
        .replace_changed_file(&replica, &req.filename, &credentials, &req.checksum)
        .await?;
    Ok(Json(report))
}
