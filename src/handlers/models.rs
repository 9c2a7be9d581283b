//! Model registry handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct ModelInfo {
    version: String,
    model_type: String,
    trained_at: DateTime<Utc>,
    feature_version: u8,
    default: bool,
    canary: bool,
    requests_served: u64,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    models: Vec<ModelInfo>,
    default_version: String,
    canary_version: String,
    ab_split_ratio: f64,
}

/// List loaded model versions with routing and usage counts
pub async fn list(State(state): State<AppState>) -> Json<ModelsResponse> {
    let registry = state.predictor.registry();

    let mut models: Vec<ModelInfo> = registry
        .iter()
        .map(|artifact| ModelInfo {
            version: artifact.version.clone(),
            model_type: artifact.model_type.clone(),
            trained_at: artifact.trained_at,
            feature_version: artifact.feature_version,
            default: artifact.version == registry.default_version(),
            canary: artifact.version == state.router.secondary(),
            requests_served: state.metrics.model_request_count(&artifact.version),
        })
        .collect();
    models.sort_by(|a, b| a.version.cmp(&b.version));

    Json(ModelsResponse {
        models,
        default_version: registry.default_version().to_string(),
        canary_version: state.router.secondary().to_string(),
        ab_split_ratio: state.router.split(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_reports_routing_setup() {
        let state = AppState::for_tests();
        let Json(body) = list(State(state)).await;

        assert_eq!(body.models.len(), 2);
        assert_eq!(body.default_version, "v1.0");
        assert_eq!(body.canary_version, "v1.1-beta");
        assert!((body.ab_split_ratio - 0.2).abs() < 1e-12);

        assert_eq!(body.models[0].version, "v1.0");
        assert!(body.models[0].default);
        assert!(!body.models[0].canary);

        assert_eq!(body.models[1].version, "v1.1-beta");
        assert!(!body.models[1].default);
        assert!(body.models[1].canary);
    }

    #[tokio::test]
    async fn test_list_counts_served_requests() {
        let state = AppState::for_tests();
        state.metrics.record_prediction(
            "v1.0",
            std::time::Duration::from_millis(2),
            0,
            crate::model::RiskLevel::Low,
            &state
                .drift
                .check(&crate::features::TransactionRecord::example_legitimate()),
        );

        let Json(body) = list(State(state)).await;
        assert_eq!(body.models[0].requests_served, 1);
        assert_eq!(body.models[1].requests_served, 0);
    }
}
