//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::drift::BASELINE_FILENAME;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Directory holding model artifacts and the feature baseline
    pub model_dir: PathBuf,

    /// Version served to requests that do not pin one
    pub default_model_version: String,

    /// Version receiving the experimental traffic share
    pub canary_model_version: String,

    /// Fraction of auto-routed traffic sent to the canary (0.0 to 1.0)
    pub ab_split_ratio: f64,

    /// Probability cutoff for labeling a transaction fraudulent
    pub decision_threshold: f64,

    /// Probability at or above which risk is "Medium"
    pub risk_medium_threshold: f64,

    /// Probability at or above which risk is "High"
    pub risk_high_threshold: f64,

    /// Absolute z-score above which a feature counts as drifted
    pub drift_threshold: f64,

    /// Feature baseline file
    pub baseline_path: PathBuf,

    /// Accepted API keys (empty means no keys are configured)
    pub api_keys: Vec<String>,

    /// Serve unauthenticated requests as "anonymous"
    pub allow_anonymous: bool,

    /// Audit log directory, None disables the audit trail
    pub audit_dir: Option<PathBuf>,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let model_dir: PathBuf = env::var("MODEL_DIR")
            .unwrap_or_else(|_| "models".to_string())
            .into();

        let baseline_path = env::var("BASELINE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| model_dir.join(BASELINE_FILENAME));

        let audit_dir = env::var("AUDIT_DIR").unwrap_or_else(|_| "logs".to_string());

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            model_dir,

            default_model_version: env::var("DEFAULT_MODEL_VERSION")
                .unwrap_or_else(|_| "v1.0".to_string()),

            canary_model_version: env::var("CANARY_MODEL_VERSION")
                .unwrap_or_else(|_| "v1.1-beta".to_string()),

            ab_split_ratio: env::var("AB_SPLIT_RATIO")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.2),

            decision_threshold: env::var("DECISION_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.5),

            risk_medium_threshold: env::var("RISK_MEDIUM_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.3),

            risk_high_threshold: env::var("RISK_HIGH_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.7),

            drift_threshold: env::var("DRIFT_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3.0),

            baseline_path,

            api_keys: parse_api_keys(&env::var("API_KEYS").unwrap_or_default()),

            allow_anonymous: env::var("ALLOW_ANONYMOUS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),

            audit_dir: if audit_dir.is_empty() {
                None
            } else {
                Some(audit_dir.into())
            },

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Reject configurations the serving path cannot honor
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.ab_split_ratio),
            "AB_SPLIT_RATIO must be within [0.0, 1.0], got {}",
            self.ab_split_ratio
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.decision_threshold),
            "DECISION_THRESHOLD must be within [0.0, 1.0], got {}",
            self.decision_threshold
        );
        anyhow::ensure!(
            self.risk_medium_threshold < self.risk_high_threshold,
            "RISK_MEDIUM_THRESHOLD ({}) must be below RISK_HIGH_THRESHOLD ({})",
            self.risk_medium_threshold,
            self.risk_high_threshold
        );
        anyhow::ensure!(
            self.drift_threshold > 0.0,
            "DRIFT_THRESHOLD must be positive, got {}",
            self.drift_threshold
        );
        anyhow::ensure!(
            self.allow_anonymous || !self.api_keys.is_empty(),
            "API_KEYS must be set when ALLOW_ANONYMOUS is false"
        );
        Ok(())
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Split a comma-separated key list, dropping empty segments
fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| k.to_string())
        .collect()
}
