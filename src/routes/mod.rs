//! HTTP surface for `air-quality-context`.
//!
//! Gateway that merges the per-endpoint subrouters and installs the
//! middleware stack (compression, CORS, request tracing). `main.rs` only
//! sees [`router`] and [`AppContext`].

use std::sync::Arc;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ngsi::ContextRegistry;

mod entities;
mod health;

// ---

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<ContextRegistry>,
}

impl AppContext {
    pub fn new(registry: ContextRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

pub fn router(ctx: AppContext) -> Router {
    // ---
    // Any origin, with credentials: the origin is mirrored because a literal
    // `*` cannot be combined with credentials.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .merge(entities::router())
        .merge(health::router())
        .with_state(ctx)
        .layer(CompressionLayer::new().gzip(true).deflate(true))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
