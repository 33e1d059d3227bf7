//! `ProtocolVariant` record, its status vocabulary, and the
//! `PerformanceMetrics` appended to its history by `track_performance`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VariantStatus {
    Proposed,
    Testing,
    Canary,
    Active,
    Deprecated,
    RolledBack,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub success_rate: f64,
    pub latency_ms: f64,
    #[serde(default)]
    pub latency_p50: f64,
    #[serde(default)]
    pub latency_p95: f64,
    #[serde(default)]
    pub latency_p99: f64,
    #[serde(default)]
    pub throughput: f64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub total_requests: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub errors_by_type: HashMap<String, u64>,
    #[serde(default)]
    pub memory_mb: f64,
    #[serde(default)]
    pub cpu_percent: f64,
}

impl PerformanceMetrics {
    pub fn new(success_rate: f64, latency_ms: f64, error_count: u64, total_requests: u64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
            latency_ms,
            latency_p50: latency_ms,
            latency_p95: latency_ms,
            latency_p99: latency_ms,
            throughput: 0.0,
            error_count,
            total_requests,
            timestamp: Utc::now(),
            errors_by_type: HashMap::new(),
            memory_mb: 0.0,
            cpu_percent: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolVariant {
    pub variant_id: String,
    pub description: String,
    #[serde(default)]
    pub changes: HashMap<String, Value>,
    pub status: VariantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub canary_percentage: f64,
    #[serde(default)]
    pub metrics_history: Vec<PerformanceMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_variant_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub feature_flags: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_score: Option<f64>,
    #[serde(default)]
    pub rollback_count: u32,
    #[serde(default)]
    pub pause_count: u32,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Every status this variant has held, in order — used to check that
    /// a variant reaching `active` only did so via a legal path.
    #[serde(default)]
    pub status_history: Vec<VariantStatus>,
}

impl ProtocolVariant {
    pub fn recent_metrics(&self, n: usize) -> &[PerformanceMetrics] {
        let len = self.metrics_history.len();
        &self.metrics_history[len.saturating_sub(n)..]
    }

    pub fn set_status(&mut self, status: VariantStatus) {
        self.status = status;
        self.status_history.push(status);
        self.updated_at = Utc::now();
    }
}
