//! Prediction handler
//!
//! The full serving path for one transaction: validate, pick a model
//! version (pinned or A/B routed), score, check drift, record metrics
//! and the audit line, answer. Metrics and audit failures never fail
//! the request.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::audit::{generate_transaction_id, AuditEntry};
use crate::features::TransactionRecord;
use crate::middleware::auth::ClientContext;
use crate::model::RiskLevel;
use crate::{AppResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct PredictParams {
    /// Pin a model version instead of letting the A/B router pick one
    pub model_version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub transaction_id: String,
    pub prediction: u8,
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub message: &'static str,
    pub model_version: String,
    pub processing_time_ms: f64,
    pub drift_detected: bool,
}

/// Score one transaction
pub async fn predict(
    State(state): State<AppState>,
    client: ClientContext,
    Query(params): Query<PredictParams>,
    Json(record): Json<TransactionRecord>,
) -> AppResult<Json<PredictionResponse>> {
    let started = Instant::now();

    record.validate()?;

    let version = match params.model_version {
        Some(version) => version,
        None => state.router.select(&mut thread_rng()).to_string(),
    };

    let result = state.predictor.predict(&version, &record)?;
    let drift = state.drift.check(&record);
    let latency = started.elapsed();

    state.metrics.record_prediction(
        &result.model_version,
        latency,
        result.label,
        result.risk_level,
        &drift,
    );

    if drift.is_drifted() {
        tracing::warn!(
            features = ?drift.alert_names(),
            max_abs_z = drift.max_abs_z(),
            "input drift detected"
        );
    }

    let transaction_id = generate_transaction_id();
    let processing_time_ms = latency.as_secs_f64() * 1000.0;

    if let Some(audit) = &state.audit {
        audit.record(&AuditEntry {
            transaction_id: transaction_id.clone(),
            timestamp: chrono::Utc::now().timestamp(),
            model_version: result.model_version.clone(),
            prediction: result.label,
            probability: result.probability,
            risk_level: result.risk_level,
            recommended_action: result.risk_level.recommended_action().to_string(),
            processing_time_ms,
            drifted_features: drift.alert_names().iter().map(|s| s.to_string()).collect(),
            client: client.label(),
        });
    }

    tracing::debug!(
        transaction_id = %transaction_id,
        model_version = %result.model_version,
        prediction = result.label,
        risk_level = result.risk_level.as_str(),
        "prediction served"
    );

    Ok(Json(PredictionResponse {
        transaction_id,
        prediction: result.label,
        probability: result.probability,
        risk_level: result.risk_level,
        message: result.message,
        model_version: result.model_version,
        processing_time_ms,
        drift_detected: drift.is_drifted(),
    }))
}
