//! Corrections of admin data from replica reports.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::FilenamesRequest;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use bitpres_core::{AdminRecord, Checksum, ReplicaId};
use bitpres_engine::RepairReport;
use std::collections::{BTreeMap, BTreeSet};

/// GET /v1/admin-data/missing - Files on replicas that admin data lacks.
pub async fn get_missing_files_for_admin_data(
    State(state): State<AppState>,
) -> ApiResult<Json<BTreeMap<String, BTreeSet<ReplicaId>>>> {
    Ok(Json(state.engine.get_missing_files_for_admin_data().await?))
}

/// GET /v1/admin-data/changed - Admin checksums the replicas agree are wrong.
pub async fn get_changed_files_for_admin_data(
    State(state): State<AppState>,
) -> ApiResult<Json<BTreeMap<String, Checksum>>> {
    Ok(Json(state.engine.get_changed_files_for_admin_data().await?))
}

/// POST /v1/admin-data/add
pub async fn add_missing_files_to_admin_data(
    State(state): State<AppState>,
    Json(req): Json<FilenamesRequest>,
) -> ApiResult<Json<RepairReport>> {
    let report = state
        .engine
        .add_missing_files_to_admin_data(req.require_some()?)
        .await?;
    Ok(Json(report))
}

/// POST /v1/admin-data/{filename}/state
pub async fn change_state_for_admin_data(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<AdminRecord>> {
    state
        .engine
        .change_state_for_admin_data(&filename)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("file not in admin data: {filename}")))
}
