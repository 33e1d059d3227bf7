//! `EmergenceConfig`: every tunable constant named in the component
//! design, given explicit defaults confirmed against the emergence
//! engine's original source rather than left as magic numbers.

#[derive(Debug, Clone)]
pub struct EmergenceConfig {
    pub max_rollback_points: usize,
    pub canary_initial_percentage: f64,
    pub canary_ramp_steps: u32,
    pub min_success_rate: f64,
    pub max_latency_ms: f64,
    pub error_spike_threshold: u64,
    pub trend_window_size: usize,
    pub trend_degradation_threshold: f64,
    pub trend_improvement_threshold: f64,
    pub volatility_cv_threshold: f64,
    pub adaptive_ramp_enabled: bool,
    pub fast_ramp_threshold: f64,
    pub slow_ramp_threshold: f64,
    pub pause_threshold: f64,
    pub ab_significance_level: f64,
    pub min_sample_size: usize,
    pub track_outcomes: bool,
    pub failure_threshold: u32,
    pub reset_timeout_seconds: i64,
    pub half_open_success_threshold: u32,
    pub flapping_window_minutes: i64,
    pub flapping_threshold: usize,
    pub anomaly_min_samples: usize,
    pub anomaly_z_threshold: f64,
}

impl Default for EmergenceConfig {
    fn default() -> Self {
        Self {
            max_rollback_points: 10,
            canary_initial_percentage: 0.1,
            canary_ramp_steps: 5,
            min_success_rate: 0.90,
            max_latency_ms: 5000.0,
            error_spike_threshold: 10,
            trend_window_size: 5,
            trend_degradation_threshold: -0.05,
            trend_improvement_threshold: 0.05,
            volatility_cv_threshold: 0.3,
            adaptive_ramp_enabled: true,
            fast_ramp_threshold: 0.98,
            slow_ramp_threshold: 0.93,
            pause_threshold: 0.90,
            ab_significance_level: 0.95,
            min_sample_size: 100,
            track_outcomes: true,
            failure_threshold: 5,
            reset_timeout_seconds: 30,
            half_open_success_threshold: 3,
            flapping_window_minutes: 60,
            flapping_threshold: 5,
            anomaly_min_samples: 10,
            anomaly_z_threshold: 3.0,
        }
    }
}
