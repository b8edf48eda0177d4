//! Replica listing, cached scan results and rescans.

use crate::error::ApiResult;
use crate::handlers::common::parse_replica_id;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use bitpres_core::ReplicaId;
use bitpres_engine::{ReplicaSummary, ScanOutcome};
use serde::Serialize;
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// Cached result of one scan kind on one replica.
#[derive(Debug, Serialize)]
pub struct CachedFilesResponse {
    pub replica: ReplicaId,
    pub count: u64,
    pub files: BTreeSet<String>,
    /// Last completed scan; the Unix epoch if none has completed.
    #[serde(with = "time::serde::rfc3339")]
    pub checked_at: OffsetDateTime,
}

/// GET /v1/replicas
pub async fn list_replicas(State(state): State<AppState>) -> ApiResult<Json<Vec<ReplicaSummary>>> {
    let summaries = state
        .engine
        .list_replicas()
        .iter()
        .map(|replica| state.engine.replica_summary(&replica.id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(summaries))
}

/// GET /v1/replicas/{id}/missing
pub async fn get_missing_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CachedFilesResponse>> {
    let replica = parse_replica_id(&id)?;
    let files = state.engine.get_missing_files(&replica)?;
    let checked_at = state.engine.get_date_for_missing_files(&replica)?;
    Ok(Json(CachedFilesResponse {
        count: files.len() as u64,
        replica,
        files,
        checked_at,
    }))
}

/// GET /v1/replicas/{id}/changed
pub async fn get_changed_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CachedFilesResponse>> {
    let replica = parse_replica_id(&id)?;
    let files = state.engine.get_changed_files(&replica)?;
    let checked_at = state.engine.get_date_for_changed_files(&replica)?;
    Ok(Json(CachedFilesResponse {
        count: files.len() as u64,
        replica,
        files,
        checked_at,
    }))
}

/// POST /v1/replicas/{id}/missing/scan - Blocks until the scan finishes or times out.
pub async fn find_missing_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScanOutcome>> {
    let replica = parse_replica_id(&id)?;
    Ok(Json(state.engine.find_missing_files(&replica).await?))
}

/// POST /v1/replicas/{id}/changed/scan - Blocks until the scan finishes or times out.
pub async fn find_changed_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScanOutcome>> {
    let replica = parse_replica_id(&id)?;
    Ok(Json(state.engine.find_changed_files(&replica).await?))
}

/// POST /v1/replicas/{id}/cache/reset
pub async fn reset_cache(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReplicaSummary>> {
    let replica = parse_replica_id(&id)?;
    state.engine.reset_cache(&replica)?;
    Ok(Json(state.engine.replica_summary(&replica)?))
}
