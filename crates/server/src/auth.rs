//! Request tracing and operator authentication middleware.

use crate::error::ApiError;
use crate::metrics::AUTH_FAILURES;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use bitpres_core::credentials::hash_secret;
use tracing::Instrument;
use uuid::Uuid;

/// Longest client-supplied trace id kept in logs.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a client-provided id, keeping only printable ASCII.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic())
            .collect();
        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run every request inside a span carrying its trace id.
pub async fn trace_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = req
        .headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_default();
    let span = tracing::info_span!("request", trace_id = %trace_id);
    req.extensions_mut().insert(trace_id);
    next.run(req).instrument(span).await
}

/// Extract bearer token from Authorization header.
/// The scheme is matched case-insensitively (RFC 6750).
fn extract_bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

/// Reject requests without the configured operator token.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state
        .config
        .admin
        .token_hash
        .strip_prefix("sha256:")
        .unwrap_or(&state.config.admin.token_hash);

    let Some(token) = extract_bearer_token(&req) else {
        AUTH_FAILURES.with_label_values(&["missing"]).inc();
        return Err(ApiError::Unauthorized("bearer token required".to_string()));
    };
    if !hash_secret(token).eq_ignore_ascii_case(expected) {
        AUTH_FAILURES.with_label_values(&["invalid"]).inc();
        tracing::warn!(path = %req.uri().path(), "rejected operator token");
        return Err(ApiError::Unauthorized("invalid token".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_sanitized() {
        assert_eq!(TraceId::from_client("abc-123").0, "abc-123");
        assert_eq!(TraceId::from_client("a\nb c").0, "abc");
        assert_eq!(TraceId::from_client(&"x".repeat(500)).0.len(), MAX_TRACE_ID_LEN);
        // Nothing printable left: a fresh uuid is used instead.
        assert_eq!(TraceId::from_client("\n\t").0.len(), 36);
    }

    #[test]
    fn test_extract_bearer_token() {
        let req = |value: &str| {
            Request::builder()
                .header(AUTHORIZATION, value)
                .body(axum::body::Body::empty())
                .unwrap()
        };
        assert_eq!(extract_bearer_token(&req("Bearer abc")), Some("abc"));
        assert_eq!(extract_bearer_token(&req("bearer abc")), Some("abc"));
        assert_eq!(extract_bearer_token(&req("Basic abc")), None);
        assert_eq!(extract_bearer_token(&req("Bearer ")), None);
    }
}
