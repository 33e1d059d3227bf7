//! Trend analysis (linear regression over a metric window) and anomaly
//! detection (Z-score against a prior baseline).

use serde::{Deserialize, Serialize};

use crate::variant::PerformanceMetrics;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Degrading,
    Stable,
    Volatile,
    InsufficientData,
}

/// Metrics for which a lower value is better (latency-shaped), so the
/// slope sign is inverted before classifying improving vs degrading.
fn lower_is_better(metric: &str) -> bool {
    matches!(metric, "latency_ms" | "latency_p50" | "latency_p95" | "latency_p99" | "error_count")
}

fn extract(metric: &str, m: &PerformanceMetrics) -> f64 {
    match metric {
        "success_rate" => m.success_rate,
        "latency_ms" => m.latency_ms,
        "latency_p50" => m.latency_p50,
        "latency_p95" => m.latency_p95,
        "latency_p99" => m.latency_p99,
        "throughput" => m.throughput,
        "error_count" => m.error_count as f64,
        _ => 0.0,
    }
}

/// Ordinary-least-squares slope of `metric` over the window's arrival
/// order (x = 0..n-1).
fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = values.iter().sum::<f64>() / n;
    let numerator: f64 = xs.iter().zip(values).map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let denominator: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean.abs()
}

/// Analyzes the trend of `metric` over the last `window` entries of
/// `history`. Returns `InsufficientData` below `window` points.
pub fn analyze_trend(
    history: &[PerformanceMetrics],
    metric: &str,
    window: usize,
    degradation_threshold: f64,
    improvement_threshold: f64,
    volatility_cv_threshold: f64,
) -> TrendDirection {
    if history.len() < window {
        return TrendDirection::InsufficientData;
    }
    let values: Vec<f64> = history[history.len() - window..].iter().map(|m| extract(metric, m)).collect();

    let cv = coefficient_of_variation(&values);
    if cv > volatility_cv_threshold {
        return TrendDirection::Volatile;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let raw_slope = slope(&values);
    let normalized_slope = if mean != 0.0 { raw_slope / mean } else { raw_slope };

    let inverted = lower_is_better(metric);
    let effective_slope = if inverted { -normalized_slope } else { normalized_slope };

    if effective_slope > improvement_threshold.abs() {
        TrendDirection::Improving
    } else if effective_slope < -improvement_threshold.abs().max(degradation_threshold.abs()) {
        TrendDirection::Degrading
    } else {
        TrendDirection::Stable
    }
}

/// Z-score anomaly detection: the latest value against the mean/stddev
/// of everything before it. Requires at least `min_samples` prior points.
pub fn detect_anomaly(history: &[PerformanceMetrics], metric: &str, min_samples: usize, z_threshold: f64) -> Option<f64> {
    if history.len() <= min_samples {
        return None;
    }
    let (baseline, latest) = history.split_at(history.len() - 1);
    let values: Vec<f64> = baseline.iter().map(|m| extract(metric, m)).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let stddev = variance.sqrt();
    if stddev == 0.0 {
        return None;
    }
    let latest_value = extract(metric, &latest[0]);
    let z = (latest_value - mean) / stddev;
    if z.abs() > z_threshold {
        Some(z)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn metrics_with_success_rates(rates: &[f64]) -> Vec<PerformanceMetrics> {
        rates
            .iter()
            .map(|r| PerformanceMetrics {
                success_rate: *r,
                latency_ms: 100.0,
                latency_p50: 100.0,
                latency_p95: 100.0,
                latency_p99: 100.0,
                throughput: 10.0,
                error_count: 0,
                total_requests: 100,
                timestamp: Utc::now(),
                errors_by_type: Default::default(),
                memory_mb: 0.0,
                cpu_percent: 0.0,
            })
            .collect()
    }

    #[test]
    fn insufficient_data_below_window() {
        let history = metrics_with_success_rates(&[0.9, 0.9]);
        assert_eq!(analyze_trend(&history, "success_rate", 5, -0.05, 0.05, 0.3), TrendDirection::InsufficientData);
    }

    #[test]
    fn improving_trend_detected_for_rising_success_rate() {
        let history = metrics_with_success_rates(&[0.80, 0.85, 0.90, 0.95, 0.99]);
        assert_eq!(analyze_trend(&history, "success_rate", 5, -0.05, 0.05, 0.3), TrendDirection::Improving);
    }

    #[test]
    fn degrading_trend_detected_for_falling_success_rate() {
        let history = metrics_with_success_rates(&[0.99, 0.95, 0.90, 0.85, 0.80]);
        assert_eq!(analyze_trend(&history, "success_rate", 5, -0.05, 0.05, 0.3), TrendDirection::Degrading);
    }

    #[test]
    fn anomaly_requires_minimum_samples() {
        let history = metrics_with_success_rates(&[0.9; 5]);
        assert_eq!(detect_anomaly(&history, "success_rate", 10, 3.0), None);
    }
}
