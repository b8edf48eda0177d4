//! Route configuration.

use crate::auth::{require_admin, trace_middleware};
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
///
/// Reads are open; every POST requires the operator token.
pub fn create_router(state: AppState) -> Router {
    let read_routes = Router::new()
        // Health check (unauthenticated for load balancers)
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/replicas", get(handlers::list_replicas))
        .route("/v1/replicas/{id}/missing", get(handlers::get_missing_files))
        .route("/v1/replicas/{id}/changed", get(handlers::get_changed_files))
        .route(
            "/v1/preservation/{filename}",
            get(handlers::get_preservation_state),
        )
        .route(
            "/v1/admin-data/missing",
            get(handlers::get_missing_files_for_admin_data),
        )
        .route(
            "/v1/admin-data/changed",
            get(handlers::get_changed_files_for_admin_data),
        );

    let operator_routes = Router::new()
        .route(
            "/v1/preservation",
            post(handlers::get_preservation_state_map),
        )
        // Scans
        .route(
            "/v1/replicas/{id}/missing/scan",
            post(handlers::find_missing_files),
        )
        .route(
            "/v1/replicas/{id}/changed/scan",
            post(handlers::find_changed_files),
        )
        .route("/v1/replicas/{id}/cache/reset", post(handlers::reset_cache))
        // Repairs
        .route(
            "/v1/replicas/{id}/missing/upload",
            post(handlers::upload_missing_files),
        )
        .route(
            "/v1/replicas/{id}/changed/replace",
            post(handlers::replace_changed_file),
        )
        // Admin-data corrections
        .route(
            "/v1/admin-data/add",
            post(handlers::add_missing_files_to_admin_data),
        )
        .route(
            "/v1/admin-data/{filename}/state",
            post(handlers::change_state_for_admin_data),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let mut router = Router::new().merge(read_routes).merge(operator_routes);

    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .layer(middleware::from_fn(trace_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
