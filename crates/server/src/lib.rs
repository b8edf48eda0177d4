//! Operator HTTP API for the bit-preservation engine.
//!
//! This crate provides:
//! - Read endpoints over the engine's cached replica state
//! - Token-protected scan, repair and admin-data correction endpoints
//! - Prometheus exposition
//! - Service wiring for the `bitpresd` daemon

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use auth::TraceId;
pub use bootstrap::Services;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
