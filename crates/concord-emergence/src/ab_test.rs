//! A/B experimentation: paired control/treatment variants with per-side
//! metric streams and a pooled-SE Z-test for significance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::variant::PerformanceMetrics;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentSide {
    Control,
    Treatment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    Running,
    Completed,
    Inconclusive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ABTestExperiment {
    pub experiment_id: String,
    pub control_variant_id: String,
    pub treatment_variant_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub traffic_split: f64,
    #[serde(default)]
    pub control_metrics: Vec<PerformanceMetrics>,
    #[serde(default)]
    pub treatment_metrics: Vec<PerformanceMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<ExperimentSide>,
    pub confidence: f64,
    pub status: ExperimentStatus,
}

/// Two-tailed Z critical value for the configured confidence level.
/// Unlisted levels fall back to the 0.95 critical value.
pub fn z_critical(confidence_level: f64) -> f64 {
    if (confidence_level - 0.90).abs() < 1e-9 {
        1.645
    } else if (confidence_level - 0.99).abs() < 1e-9 {
        2.576
    } else {
        1.96
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Pooled-SE two-sample Z statistic over the two groups' `success_rate`
/// values. Returns `(z, mean_control, mean_treatment)`. When the pooled
/// standard error is (numerically) zero and the means differ, `z` is
/// `f64::INFINITY` — a degenerate-variance sample is still a real
/// difference, not an absence of one.
fn z_statistic(control: &[PerformanceMetrics], treatment: &[PerformanceMetrics]) -> (f64, f64, f64) {
    let control_values: Vec<f64> = control.iter().map(|m| m.success_rate).collect();
    let treatment_values: Vec<f64> = treatment.iter().map(|m| m.success_rate).collect();
    let n1 = control_values.len() as f64;
    let n2 = treatment_values.len() as f64;
    let mean1 = mean(&control_values);
    let mean2 = mean(&treatment_values);
    let var1 = variance(&control_values, mean1);
    let var2 = variance(&treatment_values, mean2);

    let pooled_variance = if n1 + n2 > 2.0 {
        ((n1 - 1.0) * var1 + (n2 - 1.0) * var2) / (n1 + n2 - 2.0)
    } else {
        0.0
    };
    let se = (pooled_variance * (1.0 / n1 + 1.0 / n2)).sqrt();

    let diff = (mean2 - mean1).abs();
    let z = if se > 1e-12 {
        diff / se
    } else if diff > 1e-12 {
        f64::INFINITY
    } else {
        0.0
    };
    (z, mean1, mean2)
}

/// Evaluates whether `experiment` has reached significance given
/// `min_sample_size` and `confidence_level`. Returns `Some((winner,
/// confidence))` when it has.
pub fn evaluate_significance(
    experiment: &ABTestExperiment,
    min_sample_size: usize,
    confidence_level: f64,
) -> Option<(ExperimentSide, f64)> {
    if experiment.control_metrics.len() < min_sample_size || experiment.treatment_metrics.len() < min_sample_size {
        return None;
    }
    let (z, mean_control, mean_treatment) = z_statistic(&experiment.control_metrics, &experiment.treatment_metrics);
    if z < z_critical(confidence_level) {
        return None;
    }
    let winner = if mean_treatment >= mean_control { ExperimentSide::Treatment } else { ExperimentSide::Control };
    let confidence = if z.is_infinite() { 0.99 } else { (1.0 - 1.0 / (1.0 + z)).min(0.99) };
    Some((winner, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(success_rate: f64, n: usize) -> Vec<PerformanceMetrics> {
        (0..n).map(|_| PerformanceMetrics::new(success_rate, 50.0, 0, 100)).collect()
    }

    #[test]
    fn below_minimum_sample_size_is_not_evaluated() {
        let experiment = ABTestExperiment {
            experiment_id: "e".into(),
            control_variant_id: "c".into(),
            treatment_variant_id: "t".into(),
            started_at: Utc::now(),
            ended_at: None,
            traffic_split: 0.5,
            control_metrics: metrics(0.8, 50),
            treatment_metrics: metrics(0.95, 50),
            winner: None,
            confidence: 0.0,
            status: ExperimentStatus::Running,
        };
        assert!(evaluate_significance(&experiment, 100, 0.95).is_none());
    }

    #[test]
    fn clear_separation_past_minimum_sample_is_significant() {
        let experiment = ABTestExperiment {
            experiment_id: "e".into(),
            control_variant_id: "c".into(),
            treatment_variant_id: "t".into(),
            started_at: Utc::now(),
            ended_at: None,
            traffic_split: 0.5,
            control_metrics: metrics(0.80, 150),
            treatment_metrics: metrics(0.95, 150),
            winner: None,
            confidence: 0.0,
            status: ExperimentStatus::Running,
        };
        let (winner, confidence) = evaluate_significance(&experiment, 100, 0.95).unwrap();
        assert_eq!(winner, ExperimentSide::Treatment);
        assert!(confidence >= 0.95);
    }
}
