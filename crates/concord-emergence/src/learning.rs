//! Learning: outcomes recorded on rollback of a non-`proposed` variant,
//! and `predict_success` over the accumulated history.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::variant::VariantStatus;

/// Outcomes below this changes-similarity are not considered predictive.
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantOutcome {
    pub variant_id: String,
    pub changes: HashMap<String, Value>,
    pub final_status: VariantStatus,
    pub avg_success_rate: f64,
    pub duration_hours: f64,
    pub rollback_count: u32,
    pub tags: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

impl VariantOutcome {
    /// Success contribution of this outcome: variants that reached
    /// `active` count as a full success regardless of their recorded
    /// average success rate; everything else contributes its measured rate.
    fn success_value(&self) -> f64 {
        if self.final_status == VariantStatus::Active {
            1.0
        } else {
            self.avg_success_rate
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningInsights {
    pub total_outcomes: usize,
    pub overall_success_rate: f64,
    pub rollback_rate: f64,
    pub average_duration_hours: f64,
    pub success_rate_by_tag: HashMap<String, f64>,
}

/// Jaccard over the key sets plus a value-match bonus over shared keys,
/// averaged and clamped to [0, 1].
fn changes_similarity(a: &HashMap<String, Value>, b: &HashMap<String, Value>) -> f64 {
    let keys_a: HashSet<&String> = a.keys().collect();
    let keys_b: HashSet<&String> = b.keys().collect();
    let intersection: Vec<&&String> = keys_a.intersection(&keys_b).collect();
    let union = keys_a.union(&keys_b).count().max(1);
    let jaccard = intersection.len() as f64 / union as f64;

    if intersection.is_empty() {
        return jaccard;
    }
    let value_matches = intersection.iter().filter(|k| a.get(***k) == b.get(***k)).count();
    let value_bonus = value_matches as f64 / intersection.len() as f64;
    ((jaccard + value_bonus) / 2.0).clamp(0.0, 1.0)
}

/// Weighted success-rate prediction against recorded outcomes whose
/// changes-similarity exceeds `SIMILARITY_THRESHOLD`. When `tags` is
/// supplied, the per-tag historical success rate is averaged in.
pub fn predict_success(outcomes: &[VariantOutcome], changes: &HashMap<String, Value>, tags: Option<&[String]>) -> f64 {
    let weighted: Vec<(f64, f64)> = outcomes
        .iter()
        .map(|o| (changes_similarity(&o.changes, changes), o.success_value()))
        .filter(|(sim, _)| *sim > SIMILARITY_THRESHOLD)
        .collect();

    let changes_prediction = if weighted.is_empty() {
        None
    } else {
        let total_weight: f64 = weighted.iter().map(|(w, _)| w).sum();
        if total_weight <= 0.0 {
            None
        } else {
            Some(weighted.iter().map(|(w, s)| w * s).sum::<f64>() / total_weight)
        }
    };

    let tag_prediction = tags.and_then(|tags| {
        if tags.is_empty() {
            return None;
        }
        let per_tag: Vec<f64> = tags
            .iter()
            .filter_map(|tag| {
                let matching: Vec<f64> = outcomes.iter().filter(|o| o.tags.iter().any(|t| t == tag)).map(|o| o.success_value()).collect();
                if matching.is_empty() {
                    None
                } else {
                    Some(matching.iter().sum::<f64>() / matching.len() as f64)
                }
            })
            .collect();
        if per_tag.is_empty() {
            None
        } else {
            Some(per_tag.iter().sum::<f64>() / per_tag.len() as f64)
        }
    });

    match (changes_prediction, tag_prediction) {
        (Some(c), Some(t)) => (c + t) / 2.0,
        (Some(c), None) => c,
        (None, Some(t)) => t,
        (None, None) => 0.5,
    }
}

pub fn insights(outcomes: &[VariantOutcome]) -> LearningInsights {
    let total = outcomes.len();
    if total == 0 {
        return LearningInsights {
            total_outcomes: 0,
            overall_success_rate: 0.0,
            rollback_rate: 0.0,
            average_duration_hours: 0.0,
            success_rate_by_tag: HashMap::new(),
        };
    }

    let overall_success_rate = outcomes.iter().map(|o| o.success_value()).sum::<f64>() / total as f64;
    let rollback_rate = outcomes.iter().filter(|o| o.final_status == VariantStatus::RolledBack).count() as f64 / total as f64;
    let average_duration_hours = outcomes.iter().map(|o| o.duration_hours).sum::<f64>() / total as f64;

    let mut by_tag: HashMap<String, Vec<f64>> = HashMap::new();
    for outcome in outcomes {
        for tag in &outcome.tags {
            by_tag.entry(tag.clone()).or_default().push(outcome.success_value());
        }
    }
    let success_rate_by_tag = by_tag.into_iter().map(|(tag, values)| (tag, values.iter().sum::<f64>() / values.len() as f64)).collect();

    LearningInsights { total_outcomes: total, overall_success_rate, rollback_rate, average_duration_hours, success_rate_by_tag }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(changes: HashMap<String, Value>, status: VariantStatus, tags: Vec<String>) -> VariantOutcome {
        VariantOutcome {
            variant_id: "v".into(),
            changes,
            final_status: status,
            avg_success_rate: 0.5,
            duration_hours: 1.0,
            rollback_count: 1,
            tags,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn dissimilar_changes_are_excluded() {
        let mut base = HashMap::new();
        base.insert("x".to_string(), json!(1));
        let outcomes = vec![outcome(base, VariantStatus::Active, vec![])];
        let mut unrelated = HashMap::new();
        unrelated.insert("totally_different_key".to_string(), json!("z"));
        assert_eq!(predict_success(&outcomes, &unrelated, None), 0.5);
    }

    #[test]
    fn active_outcomes_count_as_full_success() {
        let mut changes = HashMap::new();
        changes.insert("x".to_string(), json!(1));
        let outcomes = vec![outcome(changes.clone(), VariantStatus::Active, vec![])];
        assert_eq!(predict_success(&outcomes, &changes, None), 1.0);
    }

    #[test]
    fn tag_history_is_averaged_in() {
        let mut changes = HashMap::new();
        changes.insert("x".to_string(), json!(1));
        let outcomes = vec![outcome(changes.clone(), VariantStatus::RolledBack, vec!["risky".to_string()])];
        let tags = vec!["risky".to_string()];
        let prediction = predict_success(&outcomes, &changes, Some(&tags));
        assert!(prediction <= 0.5);
    }
}
