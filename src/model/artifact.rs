//! Serialized model artifacts
//!
//! An artifact is a trained logistic classifier exported as JSON: the
//! coefficient vector over the canonical feature layout, the intercept,
//! and the robust-scaler parameters fitted on the training split. Files
//! are loaded once at startup and never mutated afterwards.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{feature_index, validate_layout, LayoutMismatchError, FEATURE_COUNT};

/// Errors raised while loading or validating an artifact file
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatchError),

    #[error("artifact {version} has {actual} coefficients, expected {expected}")]
    CoefficientCount {
        version: String,
        expected: usize,
        actual: usize,
    },

    #[error("artifact {version} contains non-finite parameters")]
    NonFiniteParams { version: String },

    #[error("artifact at {0} has an empty version label")]
    EmptyVersion(PathBuf),

    #[error("no model artifacts found in {0}")]
    EmptyDir(PathBuf),

    #[error("default model version {0} not present in the model directory")]
    DefaultMissing(String),
}

/// Center/scale parameters fitted on the training split.
///
/// Only Time and Amount are scaled; the PCA components arrive unit-scaled
/// from the upstream transform and pass through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobustScaler {
    pub time_center: f64,
    pub time_scale: f64,
    pub amount_center: f64,
    pub amount_scale: f64,
}

impl RobustScaler {
    /// Scale a feature vector in layout order. Returns a scaled copy.
    pub fn apply(&self, values: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut scaled = *values;
        if let Some(i) = feature_index("Time") {
            scaled[i] = (scaled[i] - self.time_center) / guard_scale(self.time_scale);
        }
        if let Some(i) = feature_index("Amount") {
            scaled[i] = (scaled[i] - self.amount_center) / guard_scale(self.amount_scale);
        }
        scaled
    }

    fn is_finite(&self) -> bool {
        self.time_center.is_finite()
            && self.time_scale.is_finite()
            && self.amount_center.is_finite()
            && self.amount_scale.is_finite()
    }
}

impl Default for RobustScaler {
    /// Identity scaler (center 0, scale 1)
    fn default() -> Self {
        Self {
            time_center: 0.0,
            time_scale: 1.0,
            amount_center: 0.0,
            amount_scale: 1.0,
        }
    }
}

/// A degenerate scale would blow up the division; treat it as unscaled.
fn guard_scale(scale: f64) -> f64 {
    if scale.abs() < 1e-12 {
        1.0
    } else {
        scale
    }
}

/// A trained classifier bundle: version label, scaler, coefficients,
/// intercept. Opaque to callers beyond `score()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub model_type: String,
    pub trained_at: DateTime<Utc>,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub scaler: RobustScaler,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl ModelArtifact {
    /// Load and validate an artifact from a JSON file
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let artifact: ModelArtifact =
            serde_json::from_str(&raw).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        artifact.validate(path)?;
        Ok(artifact)
    }

    /// Reject artifacts trained against a different schema or with
    /// malformed parameters.
    pub fn validate(&self, path: &Path) -> Result<(), ArtifactError> {
        if self.version.trim().is_empty() {
            return Err(ArtifactError::EmptyVersion(path.to_path_buf()));
        }

        validate_layout(self.feature_version, self.layout_hash)?;

        if self.coefficients.len() != FEATURE_COUNT {
            return Err(ArtifactError::CoefficientCount {
                version: self.version.clone(),
                expected: FEATURE_COUNT,
                actual: self.coefficients.len(),
            });
        }

        let params_finite = self.intercept.is_finite()
            && self.scaler.is_finite()
            && self.coefficients.iter().all(|c| c.is_finite());
        if !params_finite {
            return Err(ArtifactError::NonFiniteParams {
                version: self.version.clone(),
            });
        }

        Ok(())
    }

    /// Fraud probability for a feature vector in layout order.
    /// Scales Time/Amount, dots with the coefficients, applies the
    /// logistic function. Always in [0, 1].
    pub fn score(&self, values: &[f64; FEATURE_COUNT]) -> f64 {
        let scaled = self.scaler.apply(values);

        let mut logit = self.intercept;
        for (w, x) in self.coefficients.iter().zip(scaled.iter()) {
            logit += w * x;
        }

        sigmoid(logit)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
impl ModelArtifact {
    /// Bare artifact for unit tests: identity scaler, given weights
    pub fn synthetic(version: &str, coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            version: version.to_string(),
            model_type: "logistic_regression".to_string(),
            trained_at: Utc::now(),
            feature_version: crate::features::FEATURE_VERSION,
            layout_hash: crate::features::layout_hash(),
            scaler: RobustScaler::default(),
            coefficients,
            intercept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{layout_hash, FEATURE_VERSION};

    fn flat_artifact(intercept: f64) -> ModelArtifact {
        ModelArtifact::synthetic("v1.0", vec![0.0; FEATURE_COUNT], intercept)
    }

    #[test]
    fn test_scaler_touches_only_time_and_amount() {
        let scaler = RobustScaler {
            time_center: 100.0,
            time_scale: 50.0,
            amount_center: 20.0,
            amount_scale: 10.0,
        };

        let mut values = [1.0; FEATURE_COUNT];
        values[0] = 200.0; // Time
        values[29] = 120.0; // Amount

        let scaled = scaler.apply(&values);
        assert!((scaled[0] - 2.0).abs() < 1e-12);
        assert!((scaled[29] - 10.0).abs() < 1e-12);
        for i in 1..29 {
            assert_eq!(scaled[i], 1.0);
        }
    }

    #[test]
    fn test_zero_scale_does_not_divide() {
        let scaler = RobustScaler {
            time_center: 0.0,
            time_scale: 0.0,
            amount_center: 0.0,
            amount_scale: 0.0,
        };

        let values = [3.0; FEATURE_COUNT];
        let scaled = scaler.apply(&values);
        assert!(scaled.iter().all(|v| v.is_finite()));
        assert_eq!(scaled[0], 3.0);
        assert_eq!(scaled[29], 3.0);
    }

    #[test]
    fn test_score_is_probability() {
        for intercept in [-50.0, -4.0, 0.0, 4.0, 50.0] {
            let p = flat_artifact(intercept).score(&[0.0; FEATURE_COUNT]);
            assert!((0.0..=1.0).contains(&p), "p={p} out of range");
        }

        // sigmoid(0) is exactly one half
        assert!((flat_artifact(0.0).score(&[0.0; FEATURE_COUNT]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_score_monotonic_in_weighted_feature() {
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[14] = 2.0; // V14
        let artifact = ModelArtifact::synthetic("v1.0", coefficients, 0.0);

        let mut low = [0.0; FEATURE_COUNT];
        let mut high = [0.0; FEATURE_COUNT];
        low[14] = -1.0;
        high[14] = 1.0;

        assert!(artifact.score(&low) < artifact.score(&high));
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("v1.0.json");

        let artifact = flat_artifact(-2.0);
        std::fs::write(&path, serde_json::to_string_pretty(&artifact).unwrap()).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.version, "v1.0");
        assert_eq!(loaded.coefficients.len(), FEATURE_COUNT);
        assert_eq!(loaded.intercept, -2.0);
    }

    #[test]
    fn test_load_rejects_corrupt_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ArtifactError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_rejects_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing.json");

        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ArtifactError::Io { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_coefficient_count() {
        let mut artifact = flat_artifact(0.0);
        artifact.coefficients.pop();

        assert!(matches!(
            artifact.validate(Path::new("v1.0.json")),
            Err(ArtifactError::CoefficientCount {
                expected: FEATURE_COUNT,
                actual,
                ..
            }) if actual == FEATURE_COUNT - 1
        ));
    }

    #[test]
    fn test_validate_rejects_layout_mismatch() {
        let mut artifact = flat_artifact(0.0);
        artifact.feature_version = FEATURE_VERSION + 1;
        artifact.layout_hash = layout_hash();

        assert!(matches!(
            artifact.validate(Path::new("v1.0.json")),
            Err(ArtifactError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_finite_params() {
        let mut artifact = flat_artifact(0.0);
        artifact.coefficients[3] = f64::NAN;

        assert!(matches!(
            artifact.validate(Path::new("v1.0.json")),
            Err(ArtifactError::NonFiniteParams { .. })
        ));
    }
}
