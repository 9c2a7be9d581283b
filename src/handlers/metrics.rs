//! Metrics exposition handler

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::AppState;

/// Prometheus text exposition content type
const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn export(State(state): State<AppState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, TEXT_FORMAT)], state.metrics.render())
}
