//! Fraudgate - Fraud Detection Model Serving API
//!
//! Serves fraud predictions over HTTP from versioned logistic
//! regression artifacts, with A/B traffic routing, input drift
//! monitoring and a prediction audit trail.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         FRAUDGATE                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌────────────┐   ┌───────────────────────┐ │
//! │  │  API      │   │  A/B Model │   │  Drift Monitor        │ │
//! │  │  Gateway  │──▶│  Router    │──▶│  (feature baseline)   │ │
//! │  │  (Axum)   │   │            │   │                       │ │
//! │  └─────┬─────┘   └─────┬──────┘   └──────────┬────────────┘ │
//! │        │               ▼                     ▼              │
//! │        │        ┌─────────────┐      ┌──────────────┐       │
//! │        │        │  Model      │      │  Metrics +   │       │
//! │        └───────▶│  Registry   │      │  Audit Trail │       │
//! │                 └─────────────┘      └──────────────┘       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod audit;
mod config;
mod drift;
mod error;
mod features;
mod handlers;
mod metrics;
mod middleware;
mod model;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::Uri,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::audit::AuditLog;
use crate::drift::{DriftMonitor, FeatureBaseline};
use crate::metrics::ServiceMetrics;
use crate::model::{ModelRegistry, ModelRouter, Predictor, RiskThresholds};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "fraudgate=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();
    config.validate().context("invalid configuration")?;

    tracing::info!("Fraudgate starting...");
    tracing::info!(
        model_dir = %config.model_dir.display(),
        default_version = %config.default_model_version,
        canary_version = %config.canary_model_version,
        ab_split_ratio = config.ab_split_ratio,
        "serving configuration"
    );

    // Load model artifacts; a deployment that cannot serve its default
    // model must not come up
    let registry = ModelRegistry::load_dir(&config.model_dir, &config.default_model_version)
        .context("failed to load model artifacts")?;

    let baseline = FeatureBaseline::load(&config.baseline_path)
        .context("failed to load feature baseline")?;
    tracing::info!(
        baseline = %baseline.name,
        samples = baseline.samples,
        "loaded feature baseline"
    );

    let metrics = Arc::new(ServiceMetrics::new(&registry.versions()));

    let audit = match &config.audit_dir {
        Some(dir) => {
            let log = AuditLog::open(dir.clone()).context("failed to open audit log")?;
            Some(Arc::new(log))
        }
        None => None,
    };

    // Build application state
    let state = AppState {
        router: Arc::new(ModelRouter::new(
            &config.default_model_version,
            &config.canary_model_version,
            config.ab_split_ratio,
        )),
        drift: Arc::new(DriftMonitor::new(baseline, config.drift_threshold)),
        predictor: Arc::new(Predictor::new(
            registry,
            config.decision_threshold,
            RiskThresholds {
                medium: config.risk_medium_threshold,
                high: config.risk_high_threshold,
            },
        )),
        metrics,
        audit,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listen address")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub predictor: Arc<Predictor>,
    pub router: Arc<ModelRouter>,
    pub drift: Arc<DriftMonitor>,
    pub metrics: Arc<ServiceMetrics>,
    pub audit: Option<Arc<AuditLog>>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no API key required)
    let public_routes = Router::new()
        .route("/", get(handlers::health::index))
        .route("/health", get(handlers::health::check))
        .route("/metrics", get(handlers::metrics::export));

    // Serving routes (API key resolved into a client context)
    let serving_routes = Router::new()
        .route("/predict", post(handlers::predict::predict))
        .route("/models", get(handlers::models::list))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_api_key,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(serving_routes)
        .fallback(fallback_404)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::track::track_requests,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// JSON 404 for requests that match no route, same error body shape as
/// every other failure
async fn fallback_404(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}

#[cfg(test)]
impl AppState {
    /// Fully wired in-memory state. The default model answers a fixed
    /// low probability, the canary a fixed high one, so both outcome
    /// paths are reachable without artifact files.
    pub fn for_tests() -> Self {
        use crate::features::{layout_hash, FEATURE_COUNT, FEATURE_VERSION};
        use crate::model::ModelArtifact;

        let registry = ModelRegistry::new(
            vec![
                ModelArtifact::synthetic("v1.0", vec![0.0; FEATURE_COUNT], -4.0),
                ModelArtifact::synthetic("v1.1-beta", vec![0.0; FEATURE_COUNT], 4.0),
            ],
            "v1.0",
        );
        let metrics = Arc::new(ServiceMetrics::new(&registry.versions()));

        // Unit baseline for the V features, dataset-scale stats for
        // Time and Amount
        let mut mean = [0.0; FEATURE_COUNT];
        let mut stddev = [1.0; FEATURE_COUNT];
        mean[0] = 94_813.86;
        stddev[0] = 47_488.15;
        mean[FEATURE_COUNT - 1] = 88.35;
        stddev[FEATURE_COUNT - 1] = 250.12;

        let baseline = FeatureBaseline {
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            samples: 1_000,
            mean,
            stddev,
            id: "test-baseline".to_string(),
            name: "unit-test".to_string(),
            created_at: 0,
        };

        Self {
            config: config::Config {
                port: 8080,
                model_dir: "models".into(),
                default_model_version: "v1.0".to_string(),
                canary_model_version: "v1.1-beta".to_string(),
                ab_split_ratio: 0.2,
                decision_threshold: 0.5,
                risk_medium_threshold: 0.3,
                risk_high_threshold: 0.7,
                drift_threshold: 3.0,
                baseline_path: "models/baseline.json".into(),
                api_keys: vec![],
                allow_anonymous: true,
                audit_dir: None,
                environment: "development".to_string(),
            },
            predictor: Arc::new(Predictor::new(registry, 0.5, RiskThresholds::default())),
            router: Arc::new(ModelRouter::new("v1.0", "v1.1-beta", 0.2)),
            drift: Arc::new(DriftMonitor::new(baseline, 3.0)),
            metrics,
            audit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::Service;

    use crate::middleware::track::UNMATCHED_ENDPOINT;

    #[tokio::test]
    async fn test_unmatched_paths_share_one_metric_series() {
        let state = AppState::for_tests();
        let mut app = create_router(state.clone());

        for i in 0..50 {
            let request = Request::builder()
                .uri(format!("/scan/{i}"))
                .body(Body::empty())
                .unwrap();
            let response = app.call(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        assert_eq!(state.metrics.api_request_count(UNMATCHED_ENDPOINT, 404), 50);

        // One series for all fifty paths, and no raw URI ever becomes a label
        let rendered = state.metrics.render();
        assert_eq!(
            rendered
                .matches(&format!("endpoint=\"{UNMATCHED_ENDPOINT}\""))
                .count(),
            1
        );
        assert!(!rendered.contains("/scan/"));
    }

    #[tokio::test]
    async fn test_requests_labeled_by_route_template() {
        let state = AppState::for_tests();
        let mut app = create_router(state.clone());

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.metrics.api_request_count("/health", 200), 1);
        assert_eq!(state.metrics.api_request_count(UNMATCHED_ENDPOINT, 404), 0);
    }

    #[tokio::test]
    async fn test_unknown_route_answers_json_not_found() {
        let state = AppState::for_tests();
        let mut app = create_router(state);

        let request = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 404);
        assert!(json["error"].as_str().unwrap().contains("/nope"));
    }
}
