//! Request accounting middleware

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

/// Label recorded for requests that matched no route. Raw URIs must
/// never become labels: every distinct scanned path would otherwise
/// grow the per-endpoint series set without bound.
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Middleware: count every request per route template and status code
///
/// Uses the matched route template ("/predict") rather than the raw
/// URI so the label set stays bounded. Requests that fall through to
/// the 404 fallback carry no `MatchedPath` and share one fixed label.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());

    let response = next.run(req).await;

    state
        .metrics
        .inc_api_request(&endpoint, response.status().as_u16());

    response
}
