//! The Alignment Scorer: five verification strategies plus a weighted
//! overall summary.
//!
//! Pure computation — no shared mutable state beyond the corpus document
//! frequencies used for text-similarity IDF weighting and the
//! caller-extensible goal-compatibility matrix, both guarded by their own
//! lock so the scorer is safe to share across threads without an engine
//! mutex of its own.

use std::collections::HashMap;

use concord_core::AgentDescriptor;
use parking_lot::Mutex;
use tracing::instrument;

use crate::context;
use crate::domain::{domain_similarity, DOMAIN_RELATED_THRESHOLD, REQUIRED_DOMAIN_MATCH_THRESHOLD};
use crate::goals::{self, default_matrix};
use crate::similarity::CorpusStats;
use crate::terminology;
use crate::types::{AlignmentResult, AlignmentStatus, AlignmentSummary, FullAlignmentCheck};
use crate::{assumptions, text};

/// Default per-strategy weights; must sum to 1.0.
pub const DEFAULT_WEIGHTS: [(&str, f64); 5] = [
    ("knowledge", 0.25),
    ("goals", 0.2),
    ("terminology", 0.2),
    ("assumptions", 0.15),
    ("context", 0.2),
];

pub struct AlignmentScorer {
    corpus: CorpusStats,
    goal_matrix: Mutex<HashMap<(String, String), f64>>,
    weights: Mutex<HashMap<String, f64>>,
}

impl Default for AlignmentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl AlignmentScorer {
    pub fn new() -> Self {
        let weights = DEFAULT_WEIGHTS.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Self {
            corpus: CorpusStats::new(),
            goal_matrix: Mutex::new(default_matrix()),
            weights: Mutex::new(weights),
        }
    }

    /// Feeds an agent's text fields (terminology definitions, assumptions,
    /// goal descriptions) into the corpus document-frequency table so
    /// later text-similarity calls weight rare shared tokens more heavily.
    /// Called by the orchestrator on `register_agent`/`update_agent`.
    pub fn observe_agent(&self, agent: &AgentDescriptor) {
        for def in agent.terminology.values() {
            self.corpus.observe(def);
        }
        for assumption in &agent.assumptions {
            self.corpus.observe(assumption);
        }
        for goal in &agent.goals {
            self.corpus.observe(&goal.description);
        }
    }

    fn text_similarity(&self, a: &str, b: &str) -> f64 {
        self.corpus.text_similarity(a, b)
    }

    /// Adds or overrides one entry in the goal-compatibility matrix.
    pub fn add_goal_compatibility(&self, type_a: impl Into<String>, type_b: impl Into<String>, score: f64) {
        self.goal_matrix.lock().insert((type_a.into(), type_b.into()), score.clamp(0.0, 1.0));
    }

    /// Overrides the per-strategy weights used by `full_alignment_check`'s
    /// summary. Fails validation if the new weights do not sum to 1.0
    /// (within floating-point tolerance).
    pub fn set_weights(&self, weights: HashMap<String, f64>) -> Result<(), String> {
        let sum: f64 = weights.values().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(format!("weights must sum to 1.0, got {sum}"));
        }
        *self.weights.lock() = weights;
        Ok(())
    }

    fn weight(&self, strategy: &str) -> f64 {
        self.weights.lock().get(strategy).copied().unwrap_or(0.0)
    }

    /// Knowledge-domain overlap, with a domain-hierarchy/text-similarity
    /// bonus for non-overlapping pairs and optional coverage of
    /// `required_domains`.
    #[instrument(skip(self, a, b))]
    pub fn verify_knowledge(&self, a: &AgentDescriptor, b: &AgentDescriptor, required_domains: Option<&[String]>) -> AlignmentResult {
        let domains_a: std::collections::HashSet<&String> = a.knowledge_domains.iter().collect();
        let domains_b: std::collections::HashSet<&String> = b.knowledge_domains.iter().collect();

        let exact_shared: Vec<&String> = domains_a.intersection(&domains_b).copied().collect();
        let union_count = domains_a.union(&domains_b).count().max(1);
        let mut overlap_ratio = exact_shared.len() as f64 / union_count as f64;

        let mut related_bonus = 0.0;
        if exact_shared.is_empty() {
            for da in &domains_a {
                for db in &domains_b {
                    let sim = domain_similarity(da, db);
                    if sim >= DOMAIN_RELATED_THRESHOLD {
                        related_bonus += sim;
                    }
                }
            }
        }
        overlap_ratio = (overlap_ratio + related_bonus).min(1.0);

        let mut missing_a = Vec::new();
        let mut missing_b = Vec::new();
        if let Some(required) = required_domains {
            for req in required {
                let covers = |domains: &std::collections::HashSet<&String>| {
                    domains.contains(req) || domains.iter().any(|d| domain_similarity(d, req) >= REQUIRED_DOMAIN_MATCH_THRESHOLD)
                };
                if !covers(&domains_a) {
                    missing_a.push(req.clone());
                }
                if !covers(&domains_b) {
                    missing_b.push(req.clone());
                }
            }
        }

        let both_missing = !missing_a.is_empty() && !missing_b.is_empty();
        let either_missing = !missing_a.is_empty() || !missing_b.is_empty();

        let status = if both_missing {
            AlignmentStatus::Misaligned
        } else if either_missing || (overlap_ratio > 0.2 && overlap_ratio <= 0.5) {
            AlignmentStatus::Partial
        } else if overlap_ratio > 0.5 {
            AlignmentStatus::Aligned
        } else {
            AlignmentStatus::Misaligned
        };

        let mut recommendations = Vec::new();
        if !missing_a.is_empty() {
            recommendations.push(format!("agent {} is missing required domains: {:?}", a.agent_id, missing_a));
        }
        if !missing_b.is_empty() {
            recommendations.push(format!("agent {} is missing required domains: {:?}", b.agent_id, missing_b));
        }

        AlignmentResult::new("knowledge", status, overlap_ratio)
            .with_detail("overlap_ratio", overlap_ratio)
            .with_detail("shared_domains", serde_json::json!(exact_shared.iter().map(|s| s.as_str()).collect::<Vec<_>>()))
            .with_detail("missing_a", serde_json::json!(missing_a))
            .with_detail("missing_b", serde_json::json!(missing_b))
            .with_recommendations(recommendations)
    }

    /// Pairwise goal-type compatibility via the matrix, summarized as
    /// conflict/alignment ratios.
    #[instrument(skip(self, a, b))]
    pub fn verify_goals(&self, a: &AgentDescriptor, b: &AgentDescriptor) -> AlignmentResult {
        if a.goals.is_empty() || b.goals.is_empty() {
            return AlignmentResult::new("goals", AlignmentStatus::Unknown, 0.0)
                .with_detail("reason", "one or both agents declared no goals");
        }

        let matrix = self.goal_matrix.lock();
        let mut pair_scores = Vec::new();
        for ga in &a.goals {
            for gb in &b.goals {
                pair_scores.push(goals::lookup(&matrix, &ga.goal_type, &gb.goal_type));
            }
        }
        drop(matrix);

        let total = pair_scores.len().max(1) as f64;
        let conflict_ratio = pair_scores.iter().filter(|s| **s < 0.3).count() as f64 / total;
        let alignment_ratio = pair_scores.iter().filter(|s| **s > 0.7).count() as f64 / total;

        let status = if conflict_ratio > 0.3 {
            AlignmentStatus::Misaligned
        } else if alignment_ratio > 0.5 {
            AlignmentStatus::Aligned
        } else {
            AlignmentStatus::Partial
        };

        AlignmentResult::new("goals", status, alignment_ratio)
            .with_detail("conflict_ratio", conflict_ratio)
            .with_detail("alignment_ratio", alignment_ratio)
    }

    /// Shared-term overlap with definition-conflict detection and
    /// cross-term suggestions.
    #[instrument(skip(self, a, b))]
    pub fn align_terminology(&self, a: &AgentDescriptor, b: &AgentDescriptor) -> AlignmentResult {
        let cmp = terminology::compare(&a.terminology, &b.terminology, |x, y| self.text_similarity(x, y));

        if cmp.shared_terms.is_empty() {
            return AlignmentResult::new("terminology", AlignmentStatus::Aligned, 1.0)
                .with_detail("suggested_mappings", serde_json::json!(cmp.suggested_mappings))
                .with_recommendations(
                    cmp.suggested_mappings
                        .iter()
                        .map(|(a_term, b_term)| format!("consider mapping '{a_term}' <-> '{b_term}'"))
                        .collect(),
                );
        }

        let conflict_ratio = cmp.conflicting_terms.len() as f64 / cmp.shared_terms.len() as f64;
        let confidence = 1.0 - conflict_ratio;

        let status = if conflict_ratio > 0.3 {
            AlignmentStatus::Misaligned
        } else if conflict_ratio > 0.1 {
            AlignmentStatus::Partial
        } else {
            AlignmentStatus::Aligned
        };

        let recommendations = cmp
            .conflicting_terms
            .iter()
            .map(|term| format!("term '{term}' has conflicting definitions between the two agents"))
            .chain(cmp.suggested_mappings.iter().map(|(a_term, b_term)| format!("consider mapping '{a_term}' <-> '{b_term}'")))
            .collect();

        AlignmentResult::new("terminology", status, confidence)
            .with_detail("shared_terms", serde_json::json!(cmp.shared_terms))
            .with_detail("conflicting_terms", serde_json::json!(cmp.conflicting_terms))
            .with_detail("suggested_mappings", serde_json::json!(cmp.suggested_mappings))
            .with_recommendations(recommendations)
    }

    /// Shared-assumption ratio plus antonym/negation conflict detection.
    #[instrument(skip(self, a, b))]
    pub fn verify_assumptions(&self, a: &AgentDescriptor, b: &AgentDescriptor) -> AlignmentResult {
        if a.assumptions.is_empty() && b.assumptions.is_empty() {
            return AlignmentResult::new("assumptions", AlignmentStatus::Aligned, 1.0)
                .with_detail("reason", "neither agent declared assumptions");
        }

        let set_a: std::collections::HashSet<&String> = a.assumptions.iter().collect();
        let set_b: std::collections::HashSet<&String> = b.assumptions.iter().collect();
        let shared = set_a.intersection(&set_b).count();
        let union = set_a.union(&set_b).count().max(1);
        let shared_ratio = shared as f64 / union as f64;

        let mut conflicts = Vec::new();
        for assumption_a in &a.assumptions {
            for assumption_b in &b.assumptions {
                if assumption_a == assumption_b {
                    continue;
                }
                if assumptions::assumptions_conflict(assumption_a, assumption_b, |x, y| self.text_similarity(x, y)) {
                    conflicts.push((assumption_a.clone(), assumption_b.clone()));
                }
            }
        }

        let status = if !conflicts.is_empty() {
            AlignmentStatus::Misaligned
        } else if shared_ratio > 0.5 {
            AlignmentStatus::Aligned
        } else if shared_ratio > 0.2 {
            AlignmentStatus::Partial
        } else {
            AlignmentStatus::Misaligned
        };

        let recommendations = conflicts
            .iter()
            .map(|(x, y)| format!("conflicting assumptions: '{x}' vs '{y}'"))
            .collect();

        AlignmentResult::new("assumptions", status, shared_ratio)
            .with_detail("shared_ratio", shared_ratio)
            .with_detail("conflicts", serde_json::json!(conflicts))
            .with_recommendations(recommendations)
    }

    /// Context-parameter agreement, with optional required-key coverage.
    #[instrument(skip(self, a, b))]
    pub fn sync_context(&self, a: &AgentDescriptor, b: &AgentDescriptor, required_params: Option<&[String]>) -> AlignmentResult {
        let required: Vec<String> = required_params.map(|r| r.to_vec()).unwrap_or_default();
        let cmp = context::compare(&a.context_params, &b.context_params, &required);

        let status = if !cmp.required_missing.is_empty() {
            AlignmentStatus::Misaligned
        } else if cmp.sync_ratio > 0.8 && cmp.mismatched.is_empty() {
            AlignmentStatus::Aligned
        } else if cmp.sync_ratio > 0.4 {
            AlignmentStatus::Partial
        } else {
            AlignmentStatus::Misaligned
        };

        let recommendations = cmp
            .mismatched
            .iter()
            .map(|key| format!("context key '{key}' differs between agents"))
            .chain(cmp.required_missing.iter().map(|key| format!("required context key '{key}' is missing from one or both agents")))
            .collect();

        AlignmentResult::new("context", status, cmp.sync_ratio)
            .with_detail("matched", serde_json::json!(cmp.matched))
            .with_detail("mismatched", serde_json::json!(cmp.mismatched))
            .with_detail("required_missing", serde_json::json!(cmp.required_missing))
            .with_recommendations(recommendations)
    }

    /// Runs all five strategies and combines them into a weighted summary.
    #[instrument(skip(self, a, b))]
    pub fn full_alignment_check(
        &self,
        a: &AgentDescriptor,
        b: &AgentDescriptor,
        required_domains: Option<&[String]>,
        required_context_params: Option<&[String]>,
    ) -> FullAlignmentCheck {
        let mut knowledge = self.verify_knowledge(a, b, required_domains);
        let mut goals = self.verify_goals(a, b);
        let mut terminology = self.align_terminology(a, b);
        let mut assumptions = self.verify_assumptions(a, b);
        let mut context = self.sync_context(a, b, required_context_params);

        knowledge.weight = self.weight("knowledge");
        goals.weight = self.weight("goals");
        terminology.weight = self.weight("terminology");
        assumptions.weight = self.weight("assumptions");
        context.weight = self.weight("context");

        let results = [&knowledge, &goals, &terminology, &assumptions, &context];
        let total_weight: f64 = results.iter().map(|r| r.weight).sum();
        let weighted_score = if total_weight <= 0.0 {
            0.0
        } else {
            results.iter().map(|r| r.combined_score() * r.weight).sum::<f64>() / total_weight
        };

        let status = if weighted_score >= 0.75 {
            AlignmentStatus::Aligned
        } else if weighted_score >= 0.45 {
            AlignmentStatus::Partial
        } else {
            AlignmentStatus::Misaligned
        };

        let per_strategy_scores = results.iter().map(|r| (r.strategy_name.clone(), r.combined_score())).collect();

        FullAlignmentCheck {
            knowledge,
            goals,
            terminology,
            assumptions,
            context,
            summary: AlignmentSummary { status, weighted_score, per_strategy_scores },
        }
    }

    /// Convenience used by Jaccard-based callers outside this crate that
    /// need the raw tokenizer without the full text-similarity pipeline.
    pub fn tokenize(text_in: &str) -> std::collections::HashSet<String> {
        text::tokenize(text_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str) -> AgentDescriptor {
        AgentDescriptor::new(id)
    }

    #[test]
    fn full_check_status_matches_weighted_score_thresholds() {
        let scorer = AlignmentScorer::new();
        let mut a = agent("a");
        a.knowledge_domains = vec!["python".into(), "ml".into()];
        a.goals = vec![concord_core::Goal::new("assistance")];
        a.context_params.insert("env".into(), serde_json::json!("dev"));

        let mut b = agent("b");
        b.knowledge_domains = vec!["python".into(), "data_science".into()];
        b.goals = vec![concord_core::Goal::new("analysis")];
        b.context_params.insert("env".into(), serde_json::json!("dev"));

        let check = scorer.full_alignment_check(&a, &b, None, None);
        let score = check.summary.weighted_score;
        let expected_status = if score >= 0.75 {
            AlignmentStatus::Aligned
        } else if score >= 0.45 {
            AlignmentStatus::Partial
        } else {
            AlignmentStatus::Misaligned
        };
        assert_eq!(check.summary.status, expected_status);
    }

    #[test]
    fn set_weights_rejects_non_unit_sum() {
        let scorer = AlignmentScorer::new();
        let mut bad = HashMap::new();
        bad.insert("knowledge".to_string(), 0.5);
        assert!(scorer.set_weights(bad).is_err());
    }

    #[test]
    fn disjoint_agents_fail_required_domain_and_are_misaligned() {
        let scorer = AlignmentScorer::new();
        let mut a = agent("a");
        a.knowledge_domains = vec!["cooking".into()];
        let mut b = agent("b");
        b.knowledge_domains = vec!["astronomy".into()];
        let required = vec!["quantum_computing".to_string()];
        let result = scorer.verify_knowledge(&a, &b, Some(&required));
        assert_eq!(result.status, AlignmentStatus::Misaligned);
    }
}
