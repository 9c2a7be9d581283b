//! Service metrics in Prometheus exposition format
//!
//! Counters and histograms for the serving path. Everything here is
//! additive and lock-free (atomics; the two labeled maps take a short
//! write lock): recording can never fail or block a request, so the
//! serving path calls in without checking results.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use crate::drift::DriftReport;
use crate::features::{feature_name, FEATURE_COUNT};
use crate::model::RiskLevel;

/// Histogram bucket upper bounds for prediction latency, in seconds
const LATENCY_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

const PREDICTION_TYPES: [&str; 2] = ["legitimate", "fraud"];

pub struct ServiceMetrics {
    /// fraud_predictions_total by [prediction_type][risk_level]
    predictions: [[AtomicU64; 3]; 2],

    /// model_requests_total, keys fixed to the registry versions
    model_requests: HashMap<String, AtomicU64>,

    /// fraud_prediction_latency_seconds (per-bucket counts, cumulated at render)
    latency_buckets: [AtomicU64; LATENCY_BUCKETS.len()],
    latency_sum_micros: AtomicU64,
    latency_count: AtomicU64,

    /// api_requests_total by (endpoint, status)
    api_requests: RwLock<HashMap<(String, u16), u64>>,

    /// drift_alerts_total by feature, in layout order
    drift_alerts: [AtomicU64; FEATURE_COUNT],

    /// data_drift_score gauge (mean |z| of the most recent check)
    drift_score: RwLock<f64>,
}

impl ServiceMetrics {
    /// Build the recorder with the model versions known at startup
    pub fn new(versions: &[&str]) -> Self {
        let model_requests = versions
            .iter()
            .map(|v| (v.to_string(), AtomicU64::new(0)))
            .collect();

        Self {
            predictions: std::array::from_fn(|_| std::array::from_fn(|_| AtomicU64::new(0))),
            model_requests,
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_sum_micros: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            api_requests: RwLock::new(HashMap::new()),
            drift_alerts: std::array::from_fn(|_| AtomicU64::new(0)),
            drift_score: RwLock::new(0.0),
        }
    }

    /// Record one served prediction: per-version counter, outcome
    /// counter, latency observation, drift alerts, drift gauge.
    pub fn record_prediction(
        &self,
        version: &str,
        latency: Duration,
        label: u8,
        risk: RiskLevel,
        drift: &DriftReport,
    ) {
        let type_idx = usize::from(label == 1);
        self.predictions[type_idx][risk.index()].fetch_add(1, Ordering::Relaxed);

        if let Some(counter) = self.model_requests.get(version) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        self.observe_latency(latency);

        for &i in &drift.alerts {
            if let Some(counter) = self.drift_alerts.get(i) {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
        *self.drift_score.write() = drift.mean_abs_z();
    }

    pub fn observe_latency(&self, latency: Duration) {
        let seconds = latency.as_secs_f64();
        if let Some(i) = LATENCY_BUCKETS.iter().position(|&le| seconds <= le) {
            self.latency_buckets[i].fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_micros
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_api_request(&self, endpoint: &str, status: u16) {
        let mut requests = self.api_requests.write();
        *requests.entry((endpoint.to_string(), status)).or_insert(0) += 1;
    }

    // Snapshot accessors, used by the models endpoint and tests.

    pub fn prediction_count(&self, label: u8, risk: RiskLevel) -> u64 {
        let type_idx = usize::from(label == 1);
        self.predictions[type_idx][risk.index()].load(Ordering::Relaxed)
    }

    pub fn model_request_count(&self, version: &str) -> u64 {
        self.model_requests
            .get(version)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    pub fn api_request_count(&self, endpoint: &str, status: u16) -> u64 {
        self.api_requests
            .read()
            .get(&(endpoint.to_string(), status))
            .copied()
            .unwrap_or(0)
    }

    pub fn latency_count(&self) -> u64 {
        self.latency_count.load(Ordering::Relaxed)
    }

    pub fn drift_alert_count(&self, feature_index: usize) -> u64 {
        self.drift_alerts
            .get(feature_index)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Render every family in Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(
            "# HELP fraud_predictions_total Total predictions by outcome and risk level\n\
             # TYPE fraud_predictions_total counter\n",
        );
        for (type_idx, prediction_type) in PREDICTION_TYPES.iter().enumerate() {
            for risk in RiskLevel::ALL {
                let count = self.predictions[type_idx][risk.index()].load(Ordering::Relaxed);
                out.push_str(&format!(
                    "fraud_predictions_total{{prediction_type=\"{}\",risk_level=\"{}\"}} {}\n",
                    prediction_type,
                    risk.as_str(),
                    count
                ));
            }
        }

        out.push_str(
            "\n# HELP model_requests_total Prediction requests served per model version\n\
             # TYPE model_requests_total counter\n",
        );
        let mut versions: Vec<&String> = self.model_requests.keys().collect();
        versions.sort();
        for version in versions {
            out.push_str(&format!(
                "model_requests_total{{version=\"{}\"}} {}\n",
                version,
                self.model_requests[version].load(Ordering::Relaxed)
            ));
        }

        out.push_str(
            "\n# HELP fraud_prediction_latency_seconds Time spent producing a prediction\n\
             # TYPE fraud_prediction_latency_seconds histogram\n",
        );
        let mut cumulative = 0u64;
        for (i, le) in LATENCY_BUCKETS.iter().enumerate() {
            cumulative += self.latency_buckets[i].load(Ordering::Relaxed);
            out.push_str(&format!(
                "fraud_prediction_latency_seconds_bucket{{le=\"{}\"}} {}\n",
                le, cumulative
            ));
        }
        let count = self.latency_count.load(Ordering::Relaxed);
        let sum_seconds = self.latency_sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        out.push_str(&format!(
            "fraud_prediction_latency_seconds_bucket{{le=\"+Inf\"}} {}\n\
             fraud_prediction_latency_seconds_sum {:.6}\n\
             fraud_prediction_latency_seconds_count {}\n",
            count, sum_seconds, count
        ));

        out.push_str(
            "\n# HELP api_requests_total HTTP requests by endpoint and status\n\
             # TYPE api_requests_total counter\n",
        );
        let requests = self.api_requests.read();
        let mut entries: Vec<(&(String, u16), &u64)> = requests.iter().collect();
        entries.sort();
        for ((endpoint, status), count) in entries {
            out.push_str(&format!(
                "api_requests_total{{endpoint=\"{}\",status=\"{}\"}} {}\n",
                endpoint, status, count
            ));
        }
        drop(requests);

        out.push_str(
            "\n# HELP drift_alerts_total Features whose incoming values exceeded the drift threshold\n\
             # TYPE drift_alerts_total counter\n",
        );
        for (i, counter) in self.drift_alerts.iter().enumerate() {
            if let Some(name) = feature_name(i) {
                out.push_str(&format!(
                    "drift_alerts_total{{feature=\"{}\"}} {}\n",
                    name,
                    counter.load(Ordering::Relaxed)
                ));
            }
        }

        out.push_str(&format!(
            "\n# HELP data_drift_score Mean absolute z-score of the most recent check\n\
             # TYPE data_drift_score gauge\n\
             data_drift_score {:.6}\n",
            *self.drift_score.read()
        ));

        out
    }
}
