//! Tokenization and the built-in synonym table used by text similarity.

use std::collections::HashSet;

use regex::Regex;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being",
    "to", "of", "in", "on", "at", "for", "with", "by", "from", "as", "that", "this", "it",
    "its", "into", "about", "than", "then", "so", "such", "not", "can", "will", "would",
    "should", "could", "may", "might", "must", "have", "has", "had", "do", "does", "did",
];

/// Lowercase, strip non-alphanumeric, drop stopwords, drop tokens of
/// length <= 2.
pub fn tokenize(text: &str) -> HashSet<String> {
    let re = Regex::new(r"[^a-z0-9\s]").expect("valid regex");
    let cleaned = re.replace_all(&text.to_lowercase(), " ").to_string();
    cleaned
        .split_whitespace()
        .filter(|t| t.len() > 2 && !STOPWORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

/// A small built-in synonym table; each token maps to a handful of
/// near-equivalent terms used to widen the match set before Jaccard.
fn synonyms(token: &str) -> &'static [&'static str] {
    match token {
        "fast" => &["quick", "rapid", "speedy"],
        "quick" => &["fast", "rapid", "speedy"],
        "slow" => &["sluggish", "gradual"],
        "secure" => &["safe", "protected"],
        "safe" => &["secure", "protected"],
        "large" => &["big", "huge", "sizable"],
        "small" => &["tiny", "little", "compact"],
        "error" => &["fault", "failure", "bug"],
        "fail" => &["error", "crash", "fault"],
        "help" => &["assist", "support", "aid"],
        "assist" => &["help", "support", "aid"],
        "create" => &["build", "construct", "generate"],
        "build" => &["create", "construct", "generate"],
        "remove" => &["delete", "eliminate"],
        "delete" => &["remove", "eliminate"],
        "start" => &["begin", "initiate", "launch"],
        "stop" => &["halt", "end", "terminate"],
        "synchronous" => &["sync", "blocking"],
        "asynchronous" => &["async", "nonblocking"],
        "public" => &["open", "shared"],
        "private" => &["restricted", "closed"],
        _ => &[],
    }
}

/// Expands a token set with synonyms of each member, returning the union.
pub fn expand_with_synonyms(tokens: &HashSet<String>) -> HashSet<String> {
    let mut expanded = tokens.clone();
    for token in tokens {
        for syn in synonyms(token) {
            expanded.insert(syn.to_string());
        }
    }
    expanded
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_stopwords_and_short_tokens() {
        let tokens = tokenize("The system is a fast and secure API.");
        assert!(tokens.contains("system"));
        assert!(tokens.contains("fast"));
        assert!(tokens.contains("secure"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("is"));
        assert!(tokens.contains("api"));
    }

    #[test]
    fn synonym_expansion_widens_overlap() {
        let a = tokenize("the system must be fast");
        let b = tokenize("the service should be quick");
        let ea = expand_with_synonyms(&a);
        let eb = expand_with_synonyms(&b);
        assert!(jaccard(&ea, &eb) > jaccard(&a, &b));
    }
}
