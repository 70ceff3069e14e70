// src/routes/health.rs
//! Health check endpoint.
//!
//! `GET /health` answers `200 OK` with an empty body as long as the process
//! can serve HTTP. It does not touch the database. Like every route module,
//! it exports a subrouter that the gateway (`mod.rs`) merges.

use axum::{http::StatusCode, routing::get, Router};

/// Handle `GET /health`.
async fn health() -> StatusCode {
    StatusCode::OK
}

/// Subrouter with the `/health` route, generic over the gateway state.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
