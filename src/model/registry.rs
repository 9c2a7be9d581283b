//! Model registry - all loaded artifact versions
//!
//! Built once at startup from the model directory and read-only for the
//! process lifetime. Lookups for versions that were never loaded fall
//! back to the configured default instead of failing the request.

use std::collections::HashMap;
use std::path::Path;

use super::artifact::{ArtifactError, ModelArtifact};
use crate::drift::BASELINE_FILENAME;

#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, ModelArtifact>,
    default_version: String,
}

impl ModelRegistry {
    /// Registry over an in-memory artifact set (tests, tooling)
    pub fn new(artifacts: Vec<ModelArtifact>, default_version: &str) -> Self {
        let models = artifacts
            .into_iter()
            .map(|a| (a.version.clone(), a))
            .collect();
        Self {
            models,
            default_version: default_version.to_string(),
        }
    }

    /// Load every `*.json` artifact in the directory.
    ///
    /// The drift baseline lives beside the artifacts under a fixed name
    /// and is skipped here. Fails if the directory yields no artifacts or
    /// the configured default version is missing, so a misconfigured
    /// deployment dies at startup rather than at first request.
    pub fn load_dir(dir: &Path, default_version: &str) -> Result<Self, ArtifactError> {
        let entries = std::fs::read_dir(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut models = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(|source| ArtifactError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();

            if path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            if path.file_name().map_or(false, |n| n == BASELINE_FILENAME) {
                continue;
            }

            let artifact = ModelArtifact::load(&path)?;
            tracing::info!(
                version = %artifact.version,
                model_type = %artifact.model_type,
                path = %path.display(),
                "loaded model artifact"
            );
            models.insert(artifact.version.clone(), artifact);
        }

        if models.is_empty() {
            return Err(ArtifactError::EmptyDir(dir.to_path_buf()));
        }
        if !models.contains_key(default_version) {
            return Err(ArtifactError::DefaultMissing(default_version.to_string()));
        }

        Ok(Self {
            models,
            default_version: default_version.to_string(),
        })
    }

    /// Resolve a version label to an artifact, falling back to the
    /// default when the label is unknown. `None` only when the registry
    /// holds no usable artifact at all.
    pub fn resolve(&self, version: &str) -> Option<&ModelArtifact> {
        if let Some(artifact) = self.models.get(version) {
            return Some(artifact);
        }

        let fallback = self.models.get(&self.default_version);
        if fallback.is_some() {
            tracing::warn!(
                requested = version,
                default = %self.default_version,
                "unknown model version requested, serving default"
            );
        }
        fallback
    }

    pub fn default_artifact(&self) -> Option<&ModelArtifact> {
        self.models.get(&self.default_version)
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    pub fn contains(&self, version: &str) -> bool {
        self.models.contains_key(version)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Loaded versions, sorted for stable output
    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.models.keys().map(|v| v.as_str()).collect();
        versions.sort_unstable();
        versions
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelArtifact> {
        self.models.values()
    }
}
