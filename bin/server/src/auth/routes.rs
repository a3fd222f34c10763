//! Login and health routes.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, Uri, header},
    response::Response,
};
use std::sync::Arc;

use super::{
    AppState,
    pipeline::{self, InboundRequest, LoginParams},
};
use crate::canonical::CanonicalizeError;
use crate::error::AuthError;

/// Serves the login page or completes a provider callback, on any path.
///
/// Only reached by trusted peers; the router checks the peer first.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LoginParams>, QueryRejection>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AuthError> {
    let Query(params) = query.map_err(|rejection| AuthError::InvalidQuery {
        details: rejection.body_text(),
    })?;
    let forwarded = forwarded_header(&headers)?;
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());

    pipeline::run(
        &state,
        InboundRequest {
            host,
            forwarded: forwarded.as_deref(),
            uri: &uri,
            params,
        },
    )
    .await
}

/// Liveness check for the reverse proxy.
pub async fn health() -> &'static str {
    "ok"
}

/// Joins every `Forwarded` line into one list, as if sent as a single header.
fn forwarded_header(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let mut lines = Vec::new();
    for value in headers.get_all(header::FORWARDED) {
        let line = value
            .to_str()
            .map_err(|_| CanonicalizeError::MalformedForwarded {
                header: String::from_utf8_lossy(value.as_bytes()).into_owned(),
                reason: "non-ASCII characters".to_string(),
            })?;
        lines.push(line);
    }

    Ok((!lines.is_empty()).then(|| lines.join(",")))
}
