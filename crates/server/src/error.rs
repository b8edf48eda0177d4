//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bitpres_engine::EngineError;
use bitpres_metadata::MetadataError;
use bitpres_storage::StorageError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal_error",
            Self::Engine(e) => match e {
                EngineError::UnknownReplica(_) => "unknown_replica",
                EngineError::NoReferenceReplica(_) => "no_reference_replica",
                EngineError::Configuration(_) => "configuration_error",
                EngineError::PermissionDenied(_) => "permission_denied",
                EngineError::InvalidArgument(_) => "invalid_argument",
                EngineError::Metadata(_) => "metadata_error",
                EngineError::Storage(_) => "storage_error",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Engine(e) => match e {
                EngineError::UnknownReplica(_) => StatusCode::NOT_FOUND,
                EngineError::NoReferenceReplica(_) => StatusCode::CONFLICT,
                EngineError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                EngineError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                EngineError::Metadata(MetadataError::NotFound(_)) => StatusCode::NOT_FOUND,
                EngineError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
                EngineError::Configuration(_)
                | EngineError::Metadata(_)
                | EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<MetadataError> for ApiError {
    fn from(e: MetadataError) -> Self {
        Self::Engine(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
