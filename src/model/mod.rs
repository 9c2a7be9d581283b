//! Model loading, routing, and scoring

pub mod artifact;
pub mod predictor;
pub mod registry;
pub mod router;

pub use artifact::{ArtifactError, ModelArtifact, RobustScaler};
pub use predictor::{
    PredictError, PredictionResult, Predictor, RiskLevel, RiskThresholds,
};
pub use registry::ModelRegistry;
pub use router::ModelRouter;
