//! Transaction record - the fixed-schema model input
//!
//! One record per scoring request. Wire field names are the capitalized
//! dataset column names (`Time`, `V1`..`V28`, `Amount`); the struct is
//! immutable once deserialized and is dropped after the response is built.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::layout::{feature_name, FEATURE_COUNT};

/// A single transaction to score.
///
/// `Time` is seconds elapsed since the reference transaction, `V1`..`V28`
/// are the anonymized PCA components, `Amount` is the transaction amount.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransactionRecord {
    #[serde(rename = "Time")]
    #[validate(range(min = 0.0, message = "Time cannot be negative"))]
    pub time: f64,
    #[serde(rename = "V1")]
    pub v1: f64,
    #[serde(rename = "V2")]
    pub v2: f64,
    #[serde(rename = "V3")]
    pub v3: f64,
    #[serde(rename = "V4")]
    pub v4: f64,
    #[serde(rename = "V5")]
    pub v5: f64,
    #[serde(rename = "V6")]
    pub v6: f64,
    #[serde(rename = "V7")]
    pub v7: f64,
    #[serde(rename = "V8")]
    pub v8: f64,
    #[serde(rename = "V9")]
    pub v9: f64,
    #[serde(rename = "V10")]
    pub v10: f64,
    #[serde(rename = "V11")]
    pub v11: f64,
    #[serde(rename = "V12")]
    pub v12: f64,
    #[serde(rename = "V13")]
    pub v13: f64,
    #[serde(rename = "V14")]
    pub v14: f64,
    #[serde(rename = "V15")]
    pub v15: f64,
    #[serde(rename = "V16")]
    pub v16: f64,
    #[serde(rename = "V17")]
    pub v17: f64,
    #[serde(rename = "V18")]
    pub v18: f64,
    #[serde(rename = "V19")]
    pub v19: f64,
    #[serde(rename = "V20")]
    pub v20: f64,
    #[serde(rename = "V21")]
    pub v21: f64,
    #[serde(rename = "V22")]
    pub v22: f64,
    #[serde(rename = "V23")]
    pub v23: f64,
    #[serde(rename = "V24")]
    pub v24: f64,
    #[serde(rename = "V25")]
    pub v25: f64,
    #[serde(rename = "V26")]
    pub v26: f64,
    #[serde(rename = "V27")]
    pub v27: f64,
    #[serde(rename = "V28")]
    pub v28: f64,
    #[serde(rename = "Amount")]
    #[validate(range(min = 0.0, message = "Amount cannot be negative"))]
    pub amount: f64,
}

impl TransactionRecord {
    /// Values in canonical layout order (Time, V1..V28, Amount)
    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.time, self.v1, self.v2, self.v3, self.v4, self.v5, self.v6, self.v7, self.v8,
            self.v9, self.v10, self.v11, self.v12, self.v13, self.v14, self.v15, self.v16,
            self.v17, self.v18, self.v19, self.v20, self.v21, self.v22, self.v23, self.v24,
            self.v25, self.v26, self.v27, self.v28, self.amount,
        ]
    }

    /// Reject NaN/infinite values before they reach the model.
    /// Returns the name of the first offending feature.
    pub fn ensure_finite(&self) -> Result<(), &'static str> {
        for (i, value) in self.as_array().iter().enumerate() {
            if !value.is_finite() {
                return Err(feature_name(i).unwrap_or("unknown"));
            }
        }
        Ok(())
    }

    /// The well-known legitimate example transaction (first row of the
    /// public credit card dataset), used in docs and smoke tests.
    pub fn example_legitimate() -> Self {
        Self {
            time: 0.0,
            v1: -1.359807,
            v2: -0.072781,
            v3: 2.536347,
            v4: 1.378155,
            v5: -0.338321,
            v6: 0.462388,
            v7: 0.239599,
            v8: 0.098698,
            v9: 0.363787,
            v10: 0.090794,
            v11: -0.551600,
            v12: -0.617801,
            v13: -0.991390,
            v14: -0.311169,
            v15: 1.468177,
            v16: -0.470401,
            v17: 0.207971,
            v18: 0.025791,
            v19: 0.403993,
            v20: 0.251412,
            v21: -0.018307,
            v22: 0.277838,
            v23: -0.110474,
            v24: 0.066928,
            v25: 0.128539,
            v26: -0.189115,
            v27: 0.133558,
            v28: -0.021053,
            amount: 149.62,
        }
    }
}
