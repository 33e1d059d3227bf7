//! Built-in knowledge-domain hierarchy used to score near-misses between
//! non-overlapping `knowledge_domains` sets.

use std::collections::HashMap;

use crate::text::{expand_with_synonyms, jaccard, tokenize};

/// Parent -> children. Domains not present here fall back to a
/// text-token similarity between their names.
fn hierarchy() -> HashMap<&'static str, Vec<&'static str>> {
    let mut h = HashMap::new();
    h.insert(
        "machine_learning",
        vec!["deep_learning", "neural_networks", "nlp", "computer_vision", "reinforcement_learning"],
    );
    h.insert("data_science", vec!["statistics", "data_analysis", "machine_learning", "data_engineering"]);
    h.insert("software_engineering", vec!["backend", "frontend", "devops", "testing", "architecture"]);
    h.insert("nlp", vec!["text_classification", "sentiment_analysis", "machine_translation", "summarization"]);
    h.insert("security", vec!["cryptography", "network_security", "application_security", "threat_modeling"]);
    h.insert("robotics", vec!["control_systems", "perception", "motion_planning"]);
    h.insert("distributed_systems", vec!["consensus", "replication", "messaging"]);
    h
}

fn parent_of(domain: &str, tree: &HashMap<&'static str, Vec<&'static str>>) -> Option<&'static str> {
    tree.iter().find(|(_, children)| children.contains(&domain)).map(|(p, _)| *p)
}

/// Similarity in [0, 1] between two knowledge domain names.
///
/// 1.0 for identical domains, 0.8 for a direct parent/child relationship,
/// 0.6 for siblings (same parent), otherwise falls back to a text-token
/// Jaccard between the domain names (underscores treated as separators).
pub fn domain_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let tree = hierarchy();

    if let Some(children) = tree.get(a) {
        if children.contains(&b) {
            return 0.8;
        }
    }
    if let Some(children) = tree.get(b) {
        if children.contains(&a) {
            return 0.8;
        }
    }

    let parent_a = parent_of(a, &tree);
    let parent_b = parent_of(b, &tree);
    if let (Some(pa), Some(pb)) = (parent_a, parent_b) {
        if pa == pb {
            return 0.6;
        }
    }

    let tokens_a = tokenize(&a.replace('_', " "));
    let tokens_b = tokenize(&b.replace('_', " "));
    jaccard(&expand_with_synonyms(&tokens_a), &expand_with_synonyms(&tokens_b))
}

/// Threshold above which two domains are considered "related" for the
/// knowledge-overlap bonus.
pub const DOMAIN_RELATED_THRESHOLD: f64 = 0.5;

/// Threshold for fuzzy matching a required domain against a declared one.
pub const REQUIRED_DOMAIN_MATCH_THRESHOLD: f64 = 0.6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_domains_are_fully_similar() {
        assert_eq!(domain_similarity("nlp", "nlp"), 1.0);
    }

    #[test]
    fn parent_child_scores_above_related_threshold() {
        let sim = domain_similarity("machine_learning", "deep_learning");
        assert!(sim >= DOMAIN_RELATED_THRESHOLD);
    }

    #[test]
    fn siblings_score_above_related_threshold() {
        let sim = domain_similarity("deep_learning", "nlp");
        assert!(sim >= DOMAIN_RELATED_THRESHOLD);
    }

    #[test]
    fn unrelated_domains_score_low() {
        let sim = domain_similarity("cooking", "astronomy");
        assert!(sim < DOMAIN_RELATED_THRESHOLD);
    }
}
