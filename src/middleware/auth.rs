//! Authentication middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::{AppError, AppState};

/// Header carrying the client key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Client context extracted from the API key header
#[derive(Debug, Clone)]
pub struct ClientContext {
    /// Short digest prefix identifying the key, None for anonymous
    pub key_id: Option<String>,
}

impl ClientContext {
    pub fn anonymous() -> Self {
        Self { key_id: None }
    }

    pub fn is_anonymous(&self) -> bool {
        self.key_id.is_none()
    }

    /// Stable label for audit lines and logs
    pub fn label(&self) -> String {
        self.key_id
            .clone()
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Middleware: resolve the API key into a client context
///
/// A request with a key is checked against the configured key set and
/// rejected with 401 on mismatch. A request without a key is served as
/// anonymous when the configuration allows it, rejected otherwise.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = extract_api_key(&req);
    let client_ctx = authorize(provided.as_deref(), &state.config)?;

    // Insert into request extensions
    req.extensions_mut().insert(client_ctx);

    Ok(next.run(req).await)
}

/// Decide the client context for a (possibly absent) key
pub fn authorize(provided: Option<&str>, config: &Config) -> Result<ClientContext, AppError> {
    match provided {
        Some(key) if !config.api_keys.is_empty() => {
            let digest = hash_key(key);
            let known = config.api_keys.iter().any(|k| hash_key(k) == digest);
            if known {
                Ok(ClientContext {
                    key_id: Some(digest[..8].to_string()),
                })
            } else {
                tracing::warn!("Rejected request with unknown API key");
                Err(AppError::Unauthorized)
            }
        }
        // No keys configured, the header carries no meaning
        Some(_) => Ok(ClientContext::anonymous()),
        None if config.allow_anonymous => Ok(ClientContext::anonymous()),
        None => Err(AppError::Unauthorized),
    }
}

/// Extract the API key header value
fn extract_api_key(req: &Request) -> Option<String> {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

// Implement FromRequestParts for ClientContext
#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ClientContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_keys: Vec<&str>, allow_anonymous: bool) -> Config {
        Config {
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
            api_keys: api_keys.into_iter().map(String::from).collect(),
            allow_anonymous,
            audit_dir: None,
            environment: "development".to_string(),
        }
    }

    #[test]
    fn test_known_key_gets_key_id() {
        let config = config(vec!["secret-key"], true);
        let ctx = authorize(Some("secret-key"), &config).unwrap();
        assert!(!ctx.is_anonymous());

        let key_id = ctx.key_id.unwrap();
        assert_eq!(key_id.len(), 8);
        assert!(key_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let config = config(vec!["secret-key"], true);
        assert!(matches!(
            authorize(Some("wrong-key"), &config),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_missing_key_in_open_mode() {
        let config = config(vec!["secret-key"], true);
        let ctx = authorize(None, &config).unwrap();
        assert!(ctx.is_anonymous());
        assert_eq!(ctx.label(), "anonymous");
    }

    #[test]
    fn test_missing_key_in_closed_mode() {
        let config = config(vec!["secret-key"], false);
        assert!(matches!(
            authorize(None, &config),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_header_ignored_without_configured_keys() {
        let config = config(vec![], true);
        let ctx = authorize(Some("whatever"), &config).unwrap();
        assert!(ctx.is_anonymous());
    }

    #[test]
    fn test_same_key_yields_same_key_id() {
        let config = config(vec!["secret-key"], true);
        let a = authorize(Some("secret-key"), &config).unwrap();
        let b = authorize(Some("secret-key"), &config).unwrap();
        assert_eq!(a.key_id, b.key_id);
    }
}
