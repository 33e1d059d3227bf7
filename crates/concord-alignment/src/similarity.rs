//! Corpus-wide text similarity: Jaccard over synonym-expanded tokens, an
//! exact-match bonus, and IDF-style weighting built from document
//! frequencies accumulated as agents are registered.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::text::{expand_with_synonyms, jaccard, tokenize};

/// Tracks how many distinct documents (agent text fields fed in via
/// `observe`) each token has appeared in, so `text_similarity` can weight
/// rare shared tokens more heavily than common ones.
#[derive(Default)]
pub struct CorpusStats {
    inner: Mutex<CorpusInner>,
}

#[derive(Default)]
struct CorpusInner {
    document_count: u64,
    document_frequency: HashMap<String, u64>,
}

impl CorpusStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one document's worth of token occurrences (called once
    /// per text field when an agent is registered or updated).
    pub fn observe(&self, text: &str) {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();
        inner.document_count += 1;
        for token in tokens {
            *inner.document_frequency.entry(token).or_insert(0) += 1;
        }
    }

    /// IDF weight for a token: `ln(N / (1 + df))`, clamped to be
    /// non-negative; unseen tokens get the maximum weight `ln(N + 1)`.
    fn idf(&self, token: &str) -> f64 {
        let inner = self.inner.lock();
        let n = inner.document_count as f64;
        if n <= 0.0 {
            return 1.0;
        }
        let df = inner.document_frequency.get(token).copied().unwrap_or(0) as f64;
        ((n / (1.0 + df)).ln()).max(0.0)
    }

    /// Full text-similarity routine from the component design: tokenize,
    /// drop stopwords/short tokens, expand with synonyms, Jaccard, an
    /// exact-match bonus, and IDF weighting on the shared-token set.
    /// Result is clamped to [0, 1].
    pub fn text_similarity(&self, a: &str, b: &str) -> f64 {
        let tokens_a = tokenize(a);
        let tokens_b = tokenize(b);
        if tokens_a.is_empty() && tokens_b.is_empty() {
            return 1.0;
        }
        if tokens_a.is_empty() || tokens_b.is_empty() {
            return 0.0;
        }

        let expanded_a = expand_with_synonyms(&tokens_a);
        let expanded_b = expand_with_synonyms(&tokens_b);
        let base = jaccard(&expanded_a, &expanded_b);

        let exact_shared = tokens_a.intersection(&tokens_b).count();
        let exact_bonus = if exact_shared > 0 {
            0.05 * (exact_shared as f64 / tokens_a.union(&tokens_b).count().max(1) as f64).min(1.0)
        } else {
            0.0
        };

        let shared: Vec<&String> = tokens_a.intersection(&tokens_b).collect();
        let idf_weight = if shared.is_empty() {
            1.0
        } else {
            let total_idf: f64 = shared.iter().map(|t| 1.0 + self.idf(t)).sum();
            (total_idf / shared.len() as f64 / 3.0).clamp(0.5, 1.5)
        };

        (base * idf_weight + exact_bonus).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_is_fully_similar() {
        let c = CorpusStats::new();
        assert_eq!(c.text_similarity("fast reliable api", "fast reliable api"), 1.0);
    }

    #[test]
    fn disjoint_text_is_not_similar() {
        let c = CorpusStats::new();
        assert_eq!(c.text_similarity("cooking recipes", "orbital mechanics"), 0.0);
    }

    #[test]
    fn rare_shared_tokens_weight_more_than_common_ones() {
        let c = CorpusStats::new();
        for _ in 0..20 {
            c.observe("the common shared token appears everywhere");
        }
        c.observe("a rare distinctive token appears once");
        let common = c.text_similarity("common shared token here", "common shared token there");
        let rare = c.text_similarity("rare distinctive token here", "rare distinctive token there");
        assert!(rare >= common);
    }
}
