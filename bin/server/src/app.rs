//! HTTP router.

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState, TrustedPeer};

/// Builds the router. Every path other than `/healthz` runs the login pipeline.
///
/// The peer check wraps the whole router, so untrusted callers get 403
/// before path or method matching.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(auth::health))
        .route("/", get(auth::authenticate))
        .route("/{*path}", get(auth::authenticate))
        .layer(middleware::from_extractor_with_state::<TrustedPeer, _>(
            state.clone(),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
