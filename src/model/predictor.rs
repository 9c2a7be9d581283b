//! Scoring façade over the model registry
//!
//! `predict` is pure given the loaded artifacts: resolve the requested
//! version, score the record, derive label / risk level / message from
//! the probability. Latency is measured by the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::registry::ModelRegistry;
use crate::features::TransactionRecord;

const FRAUD_MESSAGE: &str = "Fraud detected!";
const LEGITIMATE_MESSAGE: &str = "Transaction seems legitimate";

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
}

/// Probability bucketing for the response and the ops dashboards.
/// Monotonic in the probability by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn from_probability(probability: f64, thresholds: &RiskThresholds) -> Self {
        if probability >= thresholds.high {
            RiskLevel::High
        } else if probability >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Suggested handling for the audit trail
    pub fn recommended_action(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Approve",
            RiskLevel::Medium => "Review",
            RiskLevel::High => "Block",
        }
    }

    /// Stable index for fixed-size metric tables
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Lower probability bounds of the Medium and High buckets
#[derive(Debug, Clone, Copy)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 0.3,
            high: 0.7,
        }
    }
}

/// One scored transaction
#[derive(Debug, Clone)]
pub struct PredictionResult {
    /// 1 = fraud, 0 = legitimate
    pub label: u8,
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub message: &'static str,
    /// Version that actually served the request (after fallback)
    pub model_version: String,
}

pub struct Predictor {
    registry: ModelRegistry,
    decision_threshold: f64,
    risk_thresholds: RiskThresholds,
}

impl Predictor {
    pub fn new(
        registry: ModelRegistry,
        decision_threshold: f64,
        risk_thresholds: RiskThresholds,
    ) -> Self {
        Self {
            registry,
            decision_threshold,
            risk_thresholds,
        }
    }

    /// Score one record with the requested model version.
    ///
    /// Unknown versions resolve to the registry default; an empty
    /// registry is a `ModelUnavailable` error, non-finite input is an
    /// `InvalidInput` error.
    pub fn predict(
        &self,
        version: &str,
        record: &TransactionRecord,
    ) -> Result<PredictionResult, PredictError> {
        record.ensure_finite().map_err(|feature| {
            PredictError::InvalidInput(format!("non-finite value for feature {feature}"))
        })?;

        let artifact = self.registry.resolve(version).ok_or_else(|| {
            PredictError::ModelUnavailable("no model artifacts loaded".to_string())
        })?;

        let probability = artifact.score(&record.as_array());
        let label = u8::from(probability >= self.decision_threshold);
        let risk_level = RiskLevel::from_probability(probability, &self.risk_thresholds);
        let message = if label == 1 {
            FRAUD_MESSAGE
        } else {
            LEGITIMATE_MESSAGE
        };

        Ok(PredictionResult {
            label,
            probability,
            risk_level,
            message,
            model_version: artifact.version.clone(),
        })
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold
    }
}
