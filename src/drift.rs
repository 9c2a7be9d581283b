//! Feature drift monitoring
//!
//! Compares each incoming feature against the training-time baseline
//! (per-feature mean/stddev) and flags values whose standardized
//! deviation exceeds the alert threshold. The baseline is loaded once at
//! startup and never updated by the serving path; refreshing it is an
//! offline artifact change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{
    feature_index, feature_name, validate_layout, LayoutMismatchError, TransactionRecord,
    FEATURE_COUNT, FEATURE_VERSION,
};

/// Fixed name of the baseline file inside the model directory
pub const BASELINE_FILENAME: &str = "baseline.json";

/// Default alert threshold in standard deviations
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 3.0;

/// Stddevs this small are treated as degenerate; z is defined as 0
const MIN_STDDEV: f64 = 1e-9;

// ============================================================================
// BASELINE
// ============================================================================

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("failed to read baseline {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse baseline {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatchError),

    #[error("baseline {id} contains non-finite or negative statistics")]
    InvalidStats { id: String },
}

/// Per-feature reference statistics from the training split, in layout
/// order. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureBaseline {
    pub feature_version: u8,
    pub layout_hash: u32,
    pub samples: u64,

    pub mean: [f64; FEATURE_COUNT],
    pub stddev: [f64; FEATURE_COUNT],

    pub id: String,
    pub name: String,
    pub created_at: i64,
}

impl FeatureBaseline {
    /// Load and validate a baseline from a JSON file
    pub fn load(path: &Path) -> Result<Self, BaselineError> {
        let raw = std::fs::read_to_string(path).map_err(|source| BaselineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let baseline: FeatureBaseline =
            serde_json::from_str(&raw).map_err(|source| BaselineError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        baseline.validate()?;
        Ok(baseline)
    }

    pub fn validate(&self) -> Result<(), BaselineError> {
        validate_layout(self.feature_version, self.layout_hash)?;

        let stats_ok = self.mean.iter().all(|m| m.is_finite())
            && self.stddev.iter().all(|s| s.is_finite() && *s >= 0.0);
        if !stats_ok {
            return Err(BaselineError::InvalidStats {
                id: self.id.clone(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// DRIFT MONITOR
// ============================================================================

pub struct DriftMonitor {
    baseline: FeatureBaseline,
    threshold: f64,
}

impl DriftMonitor {
    pub fn new(baseline: FeatureBaseline, threshold: f64) -> Self {
        Self {
            baseline,
            threshold,
        }
    }

    /// Standardize every feature of the record against the baseline.
    ///
    /// z = (value - mean) / stddev, with z defined as 0 where the
    /// baseline stddev is (near) zero. Pure apart from reading the
    /// baseline table.
    pub fn check(&self, record: &TransactionRecord) -> DriftReport {
        let values = record.as_array();
        let mut z_scores = [0.0; FEATURE_COUNT];
        let mut alerts = Vec::new();

        for (i, value) in values.iter().enumerate() {
            let sd = self.baseline.stddev[i];
            let z = if sd < MIN_STDDEV {
                0.0
            } else {
                (value - self.baseline.mean[i]) / sd
            };
            z_scores[i] = z;

            if z.abs() > self.threshold {
                alerts.push(i);
            }
        }

        DriftReport {
            z_scores,
            alerts,
            threshold: self.threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn baseline(&self) -> &FeatureBaseline {
        &self.baseline
    }
}

/// Outcome of one drift check
#[derive(Debug, Clone)]
pub struct DriftReport {
    /// z-scores in layout order
    pub z_scores: [f64; FEATURE_COUNT],
    /// Layout indices of features whose |z| exceeded the threshold
    pub alerts: Vec<usize>,
    pub threshold: f64,
}

impl DriftReport {
    pub fn is_drifted(&self) -> bool {
        !self.alerts.is_empty()
    }

    pub fn alert_names(&self) -> Vec<&'static str> {
        self.alerts
            .iter()
            .filter_map(|&i| feature_name(i))
            .collect()
    }

    pub fn z_for(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|i| self.z_scores[i])
    }

    /// (feature name, z-score) pairs in layout order
    pub fn scores(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.z_scores
            .iter()
            .enumerate()
            .filter_map(|(i, z)| feature_name(i).map(|n| (n, *z)))
    }

    /// Mean absolute deviation across all features, the aggregate
    /// exported as the drift-score gauge
    pub fn mean_abs_z(&self) -> f64 {
        let sum: f64 = self.z_scores.iter().map(|z| z.abs()).sum();
        sum / FEATURE_COUNT as f64
    }

    pub fn max_abs_z(&self) -> f64 {
        self.z_scores.iter().map(|z| z.abs()).fold(0.0, f64::max)
    }
}

// ============================================================================
// BASELINE BUILDER (offline tooling)
// ============================================================================

/// Welford accumulator for producing baseline files from sample batches.
/// Not used on the serving path.
#[derive(Debug, Clone)]
pub struct BaselineBuilder {
    count: u64,
    mean: [f64; FEATURE_COUNT],
    m2: [f64; FEATURE_COUNT],
}

impl BaselineBuilder {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: [0.0; FEATURE_COUNT],
            m2: [0.0; FEATURE_COUNT],
        }
    }

    pub fn observe(&mut self, values: &[f64; FEATURE_COUNT]) {
        self.count += 1;
        let n = self.count as f64;

        for i in 0..FEATURE_COUNT {
            let delta = values[i] - self.mean[i];
            self.mean[i] += delta / n;
            let delta2 = values[i] - self.mean[i];
            self.m2[i] += delta * delta2;
        }
    }

    pub fn samples(&self) -> u64 {
        self.count
    }

    /// Finalize into a baseline. Sample stddev (n - 1 denominator);
    /// fewer than two samples yields zero stddevs.
    pub fn build(&self, name: &str) -> FeatureBaseline {
        let mut stddev = [0.0; FEATURE_COUNT];
        if self.count > 1 {
            let denom = (self.count - 1) as f64;
            for i in 0..FEATURE_COUNT {
                stddev[i] = (self.m2[i] / denom).sqrt();
            }
        }

        FeatureBaseline {
            feature_version: FEATURE_VERSION,
            layout_hash: crate::features::layout_hash(),
            samples: self.count,
            mean: self.mean,
            stddev,
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

impl Default for BaselineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Baseline centered on the canonical example record with unit
    /// stddevs, so the example itself sits at z = 0 everywhere.
    fn example_baseline() -> FeatureBaseline {
        let mut builder = BaselineBuilder::new();
        builder.observe(&TransactionRecord::example_legitimate().as_array());

        let mut baseline = builder.build("test");
        baseline.stddev = [1.0; FEATURE_COUNT];
        baseline
    }

    #[test]
    fn test_value_at_mean_has_zero_z() {
        let monitor = DriftMonitor::new(example_baseline(), DEFAULT_DRIFT_THRESHOLD);
        let report = monitor.check(&TransactionRecord::example_legitimate());

        for (name, z) in report.scores() {
            assert!(z.abs() < 1e-9, "{name} drifted at baseline mean: z={z}");
        }
        assert!(!report.is_drifted());
        assert!(report.mean_abs_z() < 1e-9);
    }

    #[test]
    fn test_four_sigma_value_alerts() {
        let monitor = DriftMonitor::new(example_baseline(), DEFAULT_DRIFT_THRESHOLD);

        let mut record = TransactionRecord::example_legitimate();
        record.v5 += 4.0; // unit stddev, so this is 4 sigma

        let report = monitor.check(&record);
        assert!(report.is_drifted());
        assert_eq!(report.alert_names(), vec!["V5"]);
        assert!((report.z_for("V5").unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_strict() {
        let monitor = DriftMonitor::new(example_baseline(), 3.0);

        let mut record = TransactionRecord::example_legitimate();
        record.v8 += 2.9;
        assert!(!monitor.check(&record).is_drifted());

        record.v8 += 0.2; // now 3.1 sigma
        assert!(monitor.check(&record).is_drifted());
    }

    #[test]
    fn test_zero_stddev_yields_zero_z() {
        let mut baseline = example_baseline();
        baseline.stddev = [0.0; FEATURE_COUNT];
        let monitor = DriftMonitor::new(baseline, DEFAULT_DRIFT_THRESHOLD);

        let mut record = TransactionRecord::example_legitimate();
        record.amount += 10_000.0;

        let report = monitor.check(&record);
        assert!(report.z_scores.iter().all(|z| *z == 0.0));
        assert!(!report.is_drifted());
    }

    #[test]
    fn test_mean_and_max_abs_z() {
        let monitor = DriftMonitor::new(example_baseline(), DEFAULT_DRIFT_THRESHOLD);

        let mut record = TransactionRecord::example_legitimate();
        record.v1 += 6.0;

        let report = monitor.check(&record);
        assert!((report.max_abs_z() - 6.0).abs() < 1e-9);
        assert!((report.mean_abs_z() - 6.0 / FEATURE_COUNT as f64).abs() < 1e-9);
    }

    #[test]
    fn test_builder_recovers_sample_statistics() {
        let mut base = TransactionRecord::example_legitimate().as_array();
        let mut builder = BaselineBuilder::new();

        // Amounts 100, 200, 300: mean 200, sample stddev 100
        for amount in [100.0, 200.0, 300.0] {
            base[29] = amount;
            builder.observe(&base);
        }

        let baseline = builder.build("unit");
        assert_eq!(baseline.samples, 3);
        assert!((baseline.mean[29] - 200.0).abs() < 1e-9);
        assert!((baseline.stddev[29] - 100.0).abs() < 1e-9);

        // Constant features collapse to zero stddev
        assert!(baseline.stddev[0].abs() < 1e-9);
    }

    #[test]
    fn test_builder_single_sample_has_zero_stddev() {
        let mut builder = BaselineBuilder::new();
        builder.observe(&TransactionRecord::example_legitimate().as_array());

        let baseline = builder.build("unit");
        assert_eq!(baseline.samples, 1);
        assert!(baseline.stddev.iter().all(|s| *s == 0.0));
        assert!(baseline.validate().is_ok());
    }

    #[test]
    fn test_baseline_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(BASELINE_FILENAME);

        let baseline = example_baseline();
        std::fs::write(&path, serde_json::to_string_pretty(&baseline).unwrap()).unwrap();

        let loaded = FeatureBaseline::load(&path).unwrap();
        assert_eq!(loaded.id, baseline.id);
        assert_eq!(loaded.mean, baseline.mean);
    }

    #[test]
    fn test_baseline_load_rejects_corrupt_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(BASELINE_FILENAME);
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FeatureBaseline::load(&path),
            Err(BaselineError::Parse { .. })
        ));
    }

    #[test]
    fn test_baseline_rejects_layout_mismatch() {
        let mut baseline = example_baseline();
        baseline.feature_version = FEATURE_VERSION + 1;

        assert!(matches!(
            baseline.validate(),
            Err(BaselineError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn test_baseline_rejects_negative_stddev() {
        let mut baseline = example_baseline();
        baseline.stddev[3] = -1.0;

        assert!(matches!(
            baseline.validate(),
            Err(BaselineError::InvalidStats { .. })
        ));
    }
}
