//! The Emergence Engine: variant lifecycle with testing -> canary ->
//! active/rollback, per-variant circuit breaker, trend/anomaly
//! detection, A/B experimentation, and outcome-based learning.
//!
//! All state lives behind a single `parking_lot::Mutex`, per the
//! one-mutex-per-engine rule. No bus dependency here either: the
//! orchestrator and workflow runner publish events from the
//! `ProtocolVariant`/experiment snapshots this engine returns.

use std::collections::HashMap;

use chrono::Utc;
use concord_core::{ConcordError, ConcordResult};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::ab_test::{self, ABTestExperiment, ExperimentSide, ExperimentStatus};
use crate::breaker::CircuitBreaker;
use crate::config::EmergenceConfig;
use crate::learning::{self, LearningInsights, VariantOutcome};
use crate::rollback::{RollbackPoint, RollbackRing, VariantSnapshot};
use crate::trend::{self, TrendDirection};
use crate::variant::{PerformanceMetrics, ProtocolVariant, VariantStatus};

/// Normal/fast/slow/pause classification the adaptive ramp decides
/// between on each `ramp_canary` call when `force` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RampSpeed {
    Fast,
    Normal,
    Slow,
    Pause,
}

#[derive(Debug, Clone, Serialize)]
pub struct CanaryStatus {
    pub variant_id: String,
    pub status: VariantStatus,
    pub canary_percentage: f64,
    pub recent_average_success_rate: Option<f64>,
}

struct VariantRecord {
    variant: ProtocolVariant,
    breaker: CircuitBreaker,
}

struct EngineState {
    variants: HashMap<String, VariantRecord>,
    current_active_variant: Option<String>,
    rollback_points: RollbackRing,
    experiments: HashMap<String, ABTestExperiment>,
    outcomes: Vec<VariantOutcome>,
}

pub struct EmergenceEngine {
    config: EmergenceConfig,
    inner: Mutex<EngineState>,
}

impl Default for EmergenceEngine {
    fn default() -> Self {
        Self::new(EmergenceConfig::default())
    }
}

impl EmergenceEngine {
    pub fn new(config: EmergenceConfig) -> Self {
        let rollback_points = RollbackRing::new(config.max_rollback_points);
        Self {
            inner: Mutex::new(EngineState {
                variants: HashMap::new(),
                current_active_variant: None,
                rollback_points,
                experiments: HashMap::new(),
                outcomes: Vec::new(),
            }),
            config,
        }
    }

    fn new_breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(self.config.failure_threshold, self.config.reset_timeout_seconds, self.config.half_open_success_threshold)
    }

    fn get_mut<'a>(state: &'a mut EngineState, variant_id: &str) -> ConcordResult<&'a mut VariantRecord> {
        state.variants.get_mut(variant_id).ok_or_else(|| ConcordError::not_found(format!("variant {variant_id}")))
    }

    #[instrument(skip(self, changes, feature_flags))]
    pub fn propose_variant(
        &self,
        description: impl Into<String>,
        changes: HashMap<String, Value>,
        parent_variant_id: Option<String>,
        tags: Vec<String>,
        feature_flags: HashMap<String, Value>,
    ) -> ProtocolVariant {
        let now = Utc::now();
        let variant = ProtocolVariant {
            variant_id: Uuid::new_v4().to_string(),
            description: description.into(),
            changes,
            status: VariantStatus::Proposed,
            created_at: now,
            updated_at: now,
            canary_percentage: 0.0,
            metrics_history: Vec::new(),
            parent_variant_id,
            tags,
            feature_flags,
            alignment_score: None,
            rollback_count: 0,
            pause_count: 0,
            metadata: HashMap::new(),
            status_history: vec![VariantStatus::Proposed],
        };
        info!(variant_id = %variant.variant_id, "protocol variant proposed");
        let mut state = self.inner.lock();
        state.variants.insert(variant.variant_id.clone(), VariantRecord { variant: variant.clone(), breaker: self.new_breaker() });
        variant
    }

    pub fn start_testing(&self, variant_id: &str) -> ConcordResult<ProtocolVariant> {
        let mut state = self.inner.lock();
        let record = Self::get_mut(&mut state, variant_id)?;
        if record.variant.status != VariantStatus::Proposed {
            return Err(ConcordError::illegal_transition(format!("cannot start_testing from {:?}", record.variant.status)));
        }
        record.variant.set_status(VariantStatus::Testing);
        Ok(record.variant.clone())
    }

    /// `testing -> canary`, recording a `RollbackPoint` snapshot. Illegal
    /// from any status other than `testing`.
    pub fn start_canary(&self, variant_id: &str, initial_percentage: Option<f64>) -> ConcordResult<ProtocolVariant> {
        let mut state = self.inner.lock();
        let record = Self::get_mut(&mut state, variant_id)?;
        if record.variant.status != VariantStatus::Testing {
            return Err(ConcordError::illegal_transition(format!("start_canary illegal from {:?}", record.variant.status)));
        }
        let pct = initial_percentage.unwrap_or(self.config.canary_initial_percentage).clamp(0.0, 1.0);
        record.variant.canary_percentage = pct;
        record.variant.set_status(VariantStatus::Canary);

        let snapshot = VariantSnapshot { status: record.variant.status, changes: record.variant.changes.clone(), canary_percentage: pct };
        state.rollback_points.push(RollbackPoint::new(variant_id, snapshot));
        Ok(state.variants.get(variant_id).expect("just inserted").variant.clone())
    }

    fn classify_ramp_speed(&self, history: &[PerformanceMetrics]) -> RampSpeed {
        let window = history[history.len().saturating_sub(5)..].iter().map(|m| m.success_rate).collect::<Vec<_>>();
        if window.is_empty() {
            return RampSpeed::Normal;
        }
        let avg = window.iter().sum::<f64>() / window.len() as f64;
        if avg >= self.config.fast_ramp_threshold {
            RampSpeed::Fast
        } else if avg >= self.config.slow_ramp_threshold {
            RampSpeed::Normal
        } else if avg >= self.config.pause_threshold {
            RampSpeed::Slow
        } else {
            RampSpeed::Pause
        }
    }

    /// Advances a `canary` variant's ramp. `force=true` always advances
    /// by a normal step and never pauses (used by the evolution
    /// workflow's `decide` step to drive a variant to `active`).
    pub fn ramp_canary(&self, variant_id: &str, force: bool) -> ConcordResult<ProtocolVariant> {
        let mut state = self.inner.lock();
        let record = Self::get_mut(&mut state, variant_id)?;
        if record.variant.status != VariantStatus::Canary {
            return Err(ConcordError::illegal_transition(format!("ramp_canary illegal from {:?}", record.variant.status)));
        }

        let step = 1.0 / self.config.canary_ramp_steps as f64;
        let speed = if force || !self.config.adaptive_ramp_enabled {
            RampSpeed::Normal
        } else {
            self.classify_ramp_speed(&record.variant.metrics_history)
        };

        match speed {
            RampSpeed::Pause => {
                record.variant.pause_count += 1;
                record.variant.set_status(VariantStatus::Paused);
                return Ok(record.variant.clone());
            }
            RampSpeed::Fast => record.variant.canary_percentage += step * 2.0,
            RampSpeed::Normal => record.variant.canary_percentage += step,
            RampSpeed::Slow => record.variant.canary_percentage += step * 0.5,
        }
        record.variant.canary_percentage = record.variant.canary_percentage.min(1.0);
        record.variant.updated_at = Utc::now();

        if record.variant.canary_percentage >= 1.0 {
            record.variant.set_status(VariantStatus::Active);
            state.current_active_variant = Some(variant_id.to_string());
        }
        Ok(state.variants.get(variant_id).expect("just updated").variant.clone())
    }

    pub fn resume_variant(&self, variant_id: &str) -> ConcordResult<ProtocolVariant> {
        let mut state = self.inner.lock();
        let record = Self::get_mut(&mut state, variant_id)?;
        if record.variant.status != VariantStatus::Paused {
            return Err(ConcordError::illegal_transition(format!("resume_variant illegal from {:?}", record.variant.status)));
        }
        record.variant.set_status(VariantStatus::Canary);
        Ok(record.variant.clone())
    }

    fn auto_rollback_reason(&self, variant: &ProtocolVariant, breaker: &CircuitBreaker) -> Option<&'static str> {
        if breaker.state == crate::breaker::CircuitState::Open {
            return Some("circuit_breaker_open");
        }
        if breaker.is_flapping(self.config.flapping_window_minutes, self.config.flapping_threshold) {
            return Some("circuit_breaker_flapping");
        }
        let recent = variant.recent_metrics(3);
        if recent.is_empty() {
            return None;
        }
        let avg_success = recent.iter().map(|m| m.success_rate).sum::<f64>() / recent.len() as f64;
        if avg_success < self.config.min_success_rate {
            return Some("success_rate_low");
        }
        let avg_latency = recent.iter().map(|m| m.latency_ms).sum::<f64>() / recent.len() as f64;
        if avg_latency > self.config.max_latency_ms {
            return Some("latency_high");
        }
        let total_errors: u64 = recent.iter().map(|m| m.error_count).sum();
        if total_errors as f64 > self.config.error_spike_threshold as f64 * 3.0 {
            return Some("error_spike");
        }
        let trend = trend::analyze_trend(
            &variant.metrics_history,
            "success_rate",
            self.config.trend_window_size,
            self.config.trend_degradation_threshold,
            self.config.trend_improvement_threshold,
            self.config.volatility_cv_threshold,
        );
        if trend == TrendDirection::Degrading {
            return Some("trend_degrading");
        }
        None
    }

    /// Appends `metrics` to the variant's history, updates its circuit
    /// breaker, and fires an automatic rollback if any of the auto-rollback
    /// conditions are met. Not an error case — the returned variant
    /// simply carries `status = rolled_back` when that happens.
    #[instrument(skip(self, metrics))]
    pub fn track_performance(&self, variant_id: &str, metrics: PerformanceMetrics) -> ConcordResult<ProtocolVariant> {
        let mut state = self.inner.lock();
        let record = Self::get_mut(&mut state, variant_id)?;
        record.variant.metrics_history.push(metrics.clone());
        record.variant.updated_at = Utc::now();

        let breaker_failure =
            metrics.success_rate < self.config.min_success_rate
                || metrics.latency_ms > self.config.max_latency_ms
                || metrics.error_count > self.config.error_spike_threshold;
        if breaker_failure {
            record.breaker.record_failure();
        } else {
            record.breaker.record_success();
        }

        if record.variant.status == VariantStatus::RolledBack {
            return Ok(record.variant.clone());
        }

        if let Some(reason) = self.auto_rollback_reason(&record.variant, &record.breaker) {
            drop(state);
            return self.rollback(variant_id, reason);
        }

        Ok(state.variants.get(variant_id).expect("just updated").variant.clone())
    }

    pub fn should_rollback(&self, variant_id: &str) -> ConcordResult<bool> {
        let state = self.inner.lock();
        let record = state.variants.get(variant_id).ok_or_else(|| ConcordError::not_found(format!("variant {variant_id}")))?;
        Ok(self.auto_rollback_reason(&record.variant, &record.breaker).is_some())
    }

    /// Rolls `variant_id` back, recording the reason and appending a
    /// `VariantOutcome` when it was beyond `proposed`.
    #[instrument(skip(self, reason))]
    pub fn rollback(&self, variant_id: &str, reason: impl Into<String>) -> ConcordResult<ProtocolVariant> {
        let reason = reason.into();
        let mut state = self.inner.lock();
        let record = Self::get_mut(&mut state, variant_id)?;
        let was_proposed = record.variant.status == VariantStatus::Proposed;
        let final_status_before_rollback = record.variant.status;
        let avg_success_rate = if record.variant.metrics_history.is_empty() {
            0.0
        } else {
            record.variant.metrics_history.iter().map(|m| m.success_rate).sum::<f64>() / record.variant.metrics_history.len() as f64
        };
        let duration_hours = (Utc::now() - record.variant.created_at).num_seconds() as f64 / 3600.0;

        record.variant.set_status(VariantStatus::RolledBack);
        record.variant.rollback_count += 1;
        record.variant.metadata.insert("rollback_reason".to_string(), Value::String(reason.clone()));
        warn!(variant_id, reason = %reason, "variant rolled back");

        if state.current_active_variant.as_deref() == Some(variant_id) {
            state.current_active_variant = None;
        }

        if self.config.track_outcomes && !was_proposed {
            let record = state.variants.get(variant_id).expect("just updated");
            state.outcomes.push(VariantOutcome {
                variant_id: variant_id.to_string(),
                changes: record.variant.changes.clone(),
                final_status: final_status_before_rollback,
                avg_success_rate,
                duration_hours,
                rollback_count: record.variant.rollback_count,
                tags: record.variant.tags.clone(),
                recorded_at: Utc::now(),
            });
        }

        Ok(state.variants.get(variant_id).expect("just updated").variant.clone())
    }

    pub fn get_variant_status(&self, variant_id: &str) -> ConcordResult<ProtocolVariant> {
        let state = self.inner.lock();
        state.variants.get(variant_id).map(|r| r.variant.clone()).ok_or_else(|| ConcordError::not_found(format!("variant {variant_id}")))
    }

    pub fn list_variants(&self, status: Option<VariantStatus>) -> Vec<ProtocolVariant> {
        let state = self.inner.lock();
        state.variants.values().map(|r| &r.variant).filter(|v| status.map_or(true, |s| v.status == s)).cloned().collect()
    }

    pub fn get_canary_status(&self, variant_id: &str) -> ConcordResult<CanaryStatus> {
        let state = self.inner.lock();
        let record = state.variants.get(variant_id).ok_or_else(|| ConcordError::not_found(format!("variant {variant_id}")))?;
        let recent = record.variant.recent_metrics(5);
        let recent_average_success_rate =
            if recent.is_empty() { None } else { Some(recent.iter().map(|m| m.success_rate).sum::<f64>() / recent.len() as f64) };
        Ok(CanaryStatus {
            variant_id: variant_id.to_string(),
            status: record.variant.status,
            canary_percentage: record.variant.canary_percentage,
            recent_average_success_rate,
        })
    }

    pub fn analyze_variant_trend(&self, variant_id: &str, metric: &str) -> ConcordResult<TrendDirection> {
        let state = self.inner.lock();
        let record = state.variants.get(variant_id).ok_or_else(|| ConcordError::not_found(format!("variant {variant_id}")))?;
        Ok(trend::analyze_trend(
            &record.variant.metrics_history,
            metric,
            self.config.trend_window_size,
            self.config.trend_degradation_threshold,
            self.config.trend_improvement_threshold,
            self.config.volatility_cv_threshold,
        ))
    }

    pub fn detect_variant_anomaly(&self, variant_id: &str, metric: &str) -> ConcordResult<Option<f64>> {
        let state = self.inner.lock();
        let record = state.variants.get(variant_id).ok_or_else(|| ConcordError::not_found(format!("variant {variant_id}")))?;
        Ok(trend::detect_anomaly(&record.variant.metrics_history, metric, self.config.anomaly_min_samples, self.config.anomaly_z_threshold))
    }

    pub fn current_active_variant(&self) -> Option<String> {
        self.inner.lock().current_active_variant.clone()
    }

    pub fn rollback_point_for(&self, variant_id: &str) -> Option<RollbackPoint> {
        self.inner.lock().rollback_points.most_recent_for(variant_id).cloned()
    }

    // --- A/B experimentation -------------------------------------------------

    pub fn start_experiment(&self, control_variant_id: impl Into<String>, treatment_variant_id: impl Into<String>, traffic_split: f64) -> ABTestExperiment {
        let experiment = ABTestExperiment {
            experiment_id: Uuid::new_v4().to_string(),
            control_variant_id: control_variant_id.into(),
            treatment_variant_id: treatment_variant_id.into(),
            started_at: Utc::now(),
            ended_at: None,
            traffic_split: traffic_split.clamp(0.0, 1.0),
            control_metrics: Vec::new(),
            treatment_metrics: Vec::new(),
            winner: None,
            confidence: 0.0,
            status: ExperimentStatus::Running,
        };
        let mut state = self.inner.lock();
        state.experiments.insert(experiment.experiment_id.clone(), experiment.clone());
        experiment
    }

    pub fn record_experiment_metrics(&self, experiment_id: &str, side: ExperimentSide, metrics: PerformanceMetrics) -> ConcordResult<ABTestExperiment> {
        let mut state = self.inner.lock();
        let experiment =
            state.experiments.get_mut(experiment_id).ok_or_else(|| ConcordError::not_found(format!("experiment {experiment_id}")))?;
        if experiment.status != ExperimentStatus::Running {
            return Err(ConcordError::illegal_transition(format!("experiment {experiment_id} already {:?}", experiment.status)));
        }
        match side {
            ExperimentSide::Control => experiment.control_metrics.push(metrics),
            ExperimentSide::Treatment => experiment.treatment_metrics.push(metrics),
        }

        if let Some((winner, confidence)) = ab_test::evaluate_significance(experiment, self.config.min_sample_size, self.config.ab_significance_level) {
            experiment.winner = Some(winner);
            experiment.confidence = confidence;
            experiment.status = ExperimentStatus::Completed;
            experiment.ended_at = Some(Utc::now());
        }
        Ok(experiment.clone())
    }

    pub fn get_experiment_status(&self, experiment_id: &str) -> ConcordResult<ABTestExperiment> {
        let state = self.inner.lock();
        state.experiments.get(experiment_id).cloned().ok_or_else(|| ConcordError::not_found(format!("experiment {experiment_id}")))
    }

    /// Manually terminates an experiment. Omitting `winner` marks it
    /// `inconclusive` rather than `completed`.
    pub fn end_experiment(&self, experiment_id: &str, winner: Option<ExperimentSide>) -> ConcordResult<ABTestExperiment> {
        let mut state = self.inner.lock();
        let experiment =
            state.experiments.get_mut(experiment_id).ok_or_else(|| ConcordError::not_found(format!("experiment {experiment_id}")))?;
        experiment.ended_at = Some(Utc::now());
        match winner {
            Some(w) => {
                experiment.winner = Some(w);
                experiment.status = ExperimentStatus::Completed;
            }
            None => {
                experiment.status = ExperimentStatus::Inconclusive;
            }
        }
        Ok(experiment.clone())
    }

    // --- Learning -------------------------------------------------------------

    pub fn predict_success(&self, changes: &HashMap<String, Value>, tags: Option<&[String]>) -> f64 {
        let state = self.inner.lock();
        learning::predict_success(&state.outcomes, changes, tags)
    }

    pub fn get_learning_insights(&self) -> LearningInsights {
        let state = self.inner.lock();
        learning::insights(&state.outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> EmergenceEngine {
        EmergenceEngine::default()
    }

    fn bad_metrics() -> PerformanceMetrics {
        PerformanceMetrics::new(0.5, 100.0, 0, 100)
    }

    #[test]
    fn propose_then_rollback_leaves_ring_unchanged() {
        let eng = engine();
        let variant = eng.propose_variant("d", HashMap::new(), None, vec![], HashMap::new());
        let rolled = eng.rollback(&variant.variant_id, "manual").unwrap();
        assert_eq!(rolled.status, VariantStatus::RolledBack);
        assert_eq!(rolled.rollback_count, 1);
        assert_eq!(rolled.metadata.get("rollback_reason").and_then(|v| v.as_str()), Some("manual"));
        assert!(eng.rollback_point_for(&variant.variant_id).is_none());
    }

    #[test]
    fn three_bad_metric_reports_trigger_auto_rollback() {
        let eng = engine();
        let variant = eng.propose_variant("d", HashMap::new(), None, vec![], HashMap::new());
        eng.start_testing(&variant.variant_id).unwrap();
        eng.start_canary(&variant.variant_id, None).unwrap();
        let mut last = eng.track_performance(&variant.variant_id, bad_metrics()).unwrap();
        for _ in 0..2 {
            last = eng.track_performance(&variant.variant_id, bad_metrics()).unwrap();
        }
        assert_eq!(last.status, VariantStatus::RolledBack);
        assert_eq!(last.metadata.get("rollback_reason").and_then(|v| v.as_str()), Some("success_rate_low"));
        assert_eq!(last.rollback_count, 1);
    }

    #[test]
    fn ramp_to_completion_transitions_to_active() {
        let eng = EmergenceEngine::new(EmergenceConfig { adaptive_ramp_enabled: false, ..EmergenceConfig::default() });
        let variant = eng.propose_variant("d", HashMap::new(), None, vec![], HashMap::new());
        eng.start_testing(&variant.variant_id).unwrap();
        eng.start_canary(&variant.variant_id, None).unwrap();
        let mut status = VariantStatus::Canary;
        for _ in 0..10 {
            let v = eng.ramp_canary(&variant.variant_id, true).unwrap();
            status = v.status;
            if status == VariantStatus::Active {
                break;
            }
        }
        assert_eq!(status, VariantStatus::Active);
        assert_eq!(eng.current_active_variant().as_deref(), Some(variant.variant_id.as_str()));
    }

    #[test]
    fn start_canary_from_non_testing_is_illegal() {
        let eng = engine();
        let variant = eng.propose_variant("d", HashMap::new(), None, vec![], HashMap::new());
        let err = eng.start_canary(&variant.variant_id, None).unwrap_err();
        assert!(matches!(err, ConcordError::IllegalTransition(_)));
    }
}
