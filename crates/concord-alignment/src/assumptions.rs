//! Antonym table and negation heuristic used to detect conflicting
//! assumptions that a plain shared/unshared-set comparison would miss.

use crate::text::tokenize;

const ANTONYMS: &[(&str, &str)] = &[
    ("safe", "dangerous"),
    ("fast", "slow"),
    ("public", "private"),
    ("centralized", "decentralized"),
    ("synchronous", "asynchronous"),
    ("stateful", "stateless"),
    ("strict", "lenient"),
    ("open", "closed"),
    ("trusted", "untrusted"),
    ("online", "offline"),
    ("mutable", "immutable"),
];

const NEGATIONS: &[&str] = &["not", "never", "no", "cannot", "wont", "shouldnt", "isnt", "doesnt"];

fn contains_antonym_pair(tokens_a: &std::collections::HashSet<String>, tokens_b: &std::collections::HashSet<String>) -> bool {
    ANTONYMS.iter().any(|(x, y)| {
        (tokens_a.contains(*x) && tokens_b.contains(*y)) || (tokens_a.contains(*y) && tokens_b.contains(*x))
    })
}

fn strip_negations(text: &str) -> String {
    let mut cleaned = text.to_lowercase();
    for neg in NEGATIONS {
        cleaned = cleaned.replace(neg, "");
    }
    cleaned
}

/// True if `assumption_a` and `assumption_b` appear to conflict: either
/// via a known antonym pair, or because one negates a claim the other
/// makes (a negation word present in one but not the other, with the
/// negation stripped out text-similar to the other by more than 0.5).
pub fn assumptions_conflict(assumption_a: &str, assumption_b: &str, text_similarity: impl Fn(&str, &str) -> f64) -> bool {
    let tokens_a = tokenize(assumption_a);
    let tokens_b = tokenize(assumption_b);
    if contains_antonym_pair(&tokens_a, &tokens_b) {
        return true;
    }

    let a_lower = assumption_a.to_lowercase();
    let b_lower = assumption_b.to_lowercase();
    for neg in NEGATIONS {
        if a_lower.contains(neg) && !b_lower.contains(neg) {
            if text_similarity(&strip_negations(&a_lower), &b_lower) > 0.5 {
                return true;
            }
        }
        if b_lower.contains(neg) && !a_lower.contains(neg) {
            if text_similarity(&strip_negations(&b_lower), &a_lower) > 0.5 {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_similarity(a: &str, b: &str) -> f64 {
        let ta = tokenize(a);
        let tb = tokenize(b);
        if ta.is_empty() || tb.is_empty() {
            return 0.0;
        }
        let inter = ta.intersection(&tb).count();
        let union = ta.union(&tb).count();
        inter as f64 / union as f64
    }

    #[test]
    fn antonym_pair_conflicts() {
        assert!(assumptions_conflict("the api is stateless", "the api is stateful", naive_similarity));
    }

    #[test]
    fn negation_of_similar_claim_conflicts() {
        assert!(assumptions_conflict(
            "the network connection is not reliable",
            "the network connection is reliable",
            naive_similarity
        ));
    }

    #[test]
    fn unrelated_assumptions_do_not_conflict() {
        assert!(!assumptions_conflict("the sky is blue", "the ocean is deep", naive_similarity));
    }
}
