//! Preservation state lookups.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::FilenamesRequest;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use bitpres_engine::PreservationState;
use std::collections::BTreeMap;

/// GET /v1/preservation/{filename}
pub async fn get_preservation_state(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<PreservationState>> {
    state
        .engine
        .get_preservation_state(&filename)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("file not in admin data: {filename}")))
}

/// POST /v1/preservation - State for many files; unknown files map to null.
pub async fn get_preservation_state_map(
    State(state): State<AppState>,
    Json(req): Json<FilenamesRequest>,
) -> ApiResult<Json<BTreeMap<String, Option<PreservationState>>>> {
    let states = state
        .engine
        .get_preservation_state_map(req.require_some()?)
        .await?;
    Ok(Json(states))
}
