//! Health check and service index handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model_loaded: bool,
    models_loaded: usize,
    default_version: String,
    timestamp: i64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.predictor.registry();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model_loaded: !registry.is_empty(),
        models_loaded: registry.len(),
        default_version: registry.default_version().to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

#[derive(Serialize)]
pub struct IndexResponse {
    service: &'static str,
    version: &'static str,
    endpoints: &'static [&'static str],
}

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        service: "Fraud Detection API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: &["/health", "/metrics", "/models", "/predict"],
    })
}
