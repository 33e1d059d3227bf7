//! Context-parameter matching for `sync_context`.

use std::collections::HashMap;

use serde_json::Value;

pub struct ContextComparison {
    pub matched: Vec<String>,
    pub mismatched: Vec<String>,
    pub required_missing: Vec<String>,
    pub sync_ratio: f64,
}

/// Matches every key present in either side's `context_params`. A key
/// present on both sides with equal values is `matched`; present on both
/// with differing values is `mismatched`; a key named in
/// `required_params` that is absent from either side is recorded in
/// `required_missing`.
pub fn compare(
    a: &HashMap<String, Value>,
    b: &HashMap<String, Value>,
    required_params: &[String],
) -> ContextComparison {
    let mut matched = Vec::new();
    let mut mismatched = Vec::new();

    let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        match (a.get(key), b.get(key)) {
            (Some(va), Some(vb)) => {
                if va == vb {
                    matched.push(key.clone());
                } else {
                    mismatched.push(key.clone());
                }
            }
            _ => {}
        }
    }

    let required_missing: Vec<String> = required_params
        .iter()
        .filter(|key| !a.contains_key(*key) || !b.contains_key(*key))
        .cloned()
        .collect();

    let total = matched.len() + mismatched.len();
    let sync_ratio = if total == 0 { 1.0 } else { matched.len() as f64 / total as f64 };

    ContextComparison { matched, mismatched, required_missing, sync_ratio }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matching_keys_count_as_matched() {
        let mut a = HashMap::new();
        a.insert("env".to_string(), json!("dev"));
        let mut b = HashMap::new();
        b.insert("env".to_string(), json!("dev"));
        let cmp = compare(&a, &b, &[]);
        assert_eq!(cmp.matched, vec!["env".to_string()]);
        assert_eq!(cmp.sync_ratio, 1.0);
    }

    #[test]
    fn differing_values_are_mismatched() {
        let mut a = HashMap::new();
        a.insert("env".to_string(), json!("dev"));
        let mut b = HashMap::new();
        b.insert("env".to_string(), json!("prod"));
        let cmp = compare(&a, &b, &[]);
        assert_eq!(cmp.mismatched, vec!["env".to_string()]);
    }

    #[test]
    fn missing_required_param_is_flagged() {
        let a = HashMap::new();
        let b = HashMap::new();
        let cmp = compare(&a, &b, &["region".to_string()]);
        assert_eq!(cmp.required_missing, vec!["region".to_string()]);
    }
}
