//! Default goal-type compatibility matrix consulted by `verify_goals`.

use std::collections::HashMap;

/// Built-in synergy/conflict pairs; unordered (a lookup tries both
/// orientations) and defaulting to neutral (0.5) for unknown pairs.
/// Callers may layer additional entries on top via
/// `AlignmentScorer::add_goal_compatibility`.
pub fn default_matrix() -> HashMap<(String, String), f64> {
    let pairs: &[(&str, &str, f64)] = &[
        ("assistance", "education", 0.9),
        ("research", "analysis", 0.85),
        ("automation", "efficiency", 0.9),
        ("creativity", "exploration", 0.8),
        ("assistance", "support", 0.95),
        ("analysis", "optimization", 0.75),
        ("speed", "quality", 0.4),
        ("privacy", "transparency", 0.2),
        ("autonomy", "control", 0.15),
        ("exploration", "stability", 0.25),
        ("competition", "collaboration", 0.1),
    ];
    pairs
        .iter()
        .map(|(a, b, v)| ((a.to_string(), b.to_string()), *v))
        .collect()
}

pub fn lookup(matrix: &HashMap<(String, String), f64>, type_a: &str, type_b: &str) -> f64 {
    matrix
        .get(&(type_a.to_string(), type_b.to_string()))
        .or_else(|| matrix.get(&(type_b.to_string(), type_a.to_string())))
        .copied()
        .unwrap_or(0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_order_independent() {
        let m = default_matrix();
        assert_eq!(lookup(&m, "assistance", "education"), lookup(&m, "education", "assistance"));
    }

    #[test]
    fn unknown_pair_defaults_to_neutral() {
        let m = default_matrix();
        assert_eq!(lookup(&m, "foo", "bar"), 0.5);
    }
}
