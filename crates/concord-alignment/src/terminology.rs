//! Shared-term extraction and definition-conflict detection for
//! `align_terminology`.

use std::collections::HashMap;

/// Threshold above which a B-side definition is suggested as a mapping
/// for an A-only term.
pub const TERMINOLOGY_SUGGESTION_THRESHOLD: f64 = 0.7;

pub struct TermComparison {
    pub shared_terms: Vec<String>,
    pub conflicting_terms: Vec<String>,
    /// a_term -> suggested b_term, where B's definition is textually
    /// close to A's for a term A declares but B does not.
    pub suggested_mappings: HashMap<String, String>,
}

/// Compares two term->definition maps, detecting shared terms whose
/// definitions disagree (case-insensitively) and suggesting cross-maps
/// for terms unique to `a` whose meaning a term in `b` appears to share.
pub fn compare(
    a: &HashMap<String, String>,
    b: &HashMap<String, String>,
    similarity: impl Fn(&str, &str) -> f64,
) -> TermComparison {
    let mut shared_terms = Vec::new();
    let mut conflicting_terms = Vec::new();

    for (term, def_a) in a {
        if let Some(def_b) = b.get(term) {
            shared_terms.push(term.clone());
            if def_a.to_lowercase() != def_b.to_lowercase() {
                conflicting_terms.push(term.clone());
            }
        }
    }
    shared_terms.sort();
    conflicting_terms.sort();

    let mut suggested_mappings = HashMap::new();
    for (term_a, def_a) in a {
        if b.contains_key(term_a) {
            continue;
        }
        let mut best: Option<(&str, f64)> = None;
        for (term_b, def_b) in b {
            let score = similarity(def_a, def_b);
            if score > TERMINOLOGY_SUGGESTION_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
                best = Some((term_b.as_str(), score));
            }
        }
        if let Some((term_b, _)) = best {
            suggested_mappings.insert(term_a.clone(), term_b.to_string());
        }
    }

    TermComparison { shared_terms, conflicting_terms, suggested_mappings }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_sim(a: &str, b: &str) -> f64 {
        if a.eq_ignore_ascii_case(b) {
            1.0
        } else if a.to_lowercase().contains(&b.to_lowercase()) || b.to_lowercase().contains(&a.to_lowercase()) {
            0.8
        } else {
            0.0
        }
    }

    #[test]
    fn shared_term_with_differing_definition_conflicts() {
        let mut a = HashMap::new();
        a.insert("latency".to_string(), "time to first byte".to_string());
        let mut b = HashMap::new();
        b.insert("latency".to_string(), "total round trip time".to_string());
        let cmp = compare(&a, &b, naive_sim);
        assert_eq!(cmp.shared_terms, vec!["latency".to_string()]);
        assert_eq!(cmp.conflicting_terms, vec!["latency".to_string()]);
    }

    #[test]
    fn unique_term_suggests_close_definition() {
        let mut a = HashMap::new();
        a.insert("throughput".to_string(), "requests per second".to_string());
        let mut b = HashMap::new();
        b.insert("rps".to_string(), "requests per second".to_string());
        let cmp = compare(&a, &b, naive_sim);
        assert_eq!(cmp.suggested_mappings.get("throughput").map(String::as_str), Some("rps"));
    }
}
