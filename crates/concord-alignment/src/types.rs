//! Result types shared by every alignment strategy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStatus {
    Aligned,
    Partial,
    Misaligned,
    Unknown,
}

impl AlignmentStatus {
    /// `status_score` from the weighted-summary formula in the component
    /// design: aligned=1.0, partial=0.5, misaligned=0.0, unknown=0.25.
    pub fn score(&self) -> f64 {
        match self {
            AlignmentStatus::Aligned => 1.0,
            AlignmentStatus::Partial => 0.5,
            AlignmentStatus::Misaligned => 0.0,
            AlignmentStatus::Unknown => 0.25,
        }
    }
}

/// Per-strategy verdict returned by each of the five scorer operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub status: AlignmentStatus,
    pub confidence: f64,
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub strategy_name: String,
    pub weight: f64,
}

impl AlignmentResult {
    pub fn new(strategy_name: impl Into<String>, status: AlignmentStatus, confidence: f64) -> Self {
        Self {
            status,
            confidence: confidence.clamp(0.0, 1.0),
            details: HashMap::new(),
            recommendations: Vec::new(),
            strategy_name: strategy_name.into(),
            weight: 0.0,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_recommendations(mut self, recs: Vec<String>) -> Self {
        self.recommendations = recs;
        self
    }

    /// Combined per-strategy score used by the weighted summary:
    /// `0.6 * status_score + 0.4 * confidence`.
    pub fn combined_score(&self) -> f64 {
        0.6 * self.status.score() + 0.4 * self.confidence
    }
}

/// The bundle returned by `full_alignment_check`: all five strategy
/// results plus the weighted `_summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullAlignmentCheck {
    pub knowledge: AlignmentResult,
    pub goals: AlignmentResult,
    pub terminology: AlignmentResult,
    pub assumptions: AlignmentResult,
    pub context: AlignmentResult,
    pub summary: AlignmentSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentSummary {
    pub status: AlignmentStatus,
    pub weighted_score: f64,
    pub per_strategy_scores: HashMap<String, f64>,
}

impl FullAlignmentCheck {
    /// Count of strategies with status `aligned`, used by the
    /// orchestrator's alignment-gate score: `(aligned + 0.5*partial) / 5`.
    pub fn aligned_count(&self) -> usize {
        self.strategies().iter().filter(|r| r.status == AlignmentStatus::Aligned).count()
    }

    pub fn partial_count(&self) -> usize {
        self.strategies().iter().filter(|r| r.status == AlignmentStatus::Partial).count()
    }

    pub fn strategies(&self) -> [&AlignmentResult; 5] {
        [&self.knowledge, &self.goals, &self.terminology, &self.assumptions, &self.context]
    }
}
