//! `ServerConfig`: every engine tunable, loaded from an optional YAML
//! file and converted into the engine-native config types. A
//! dedicated, independently-`Deserialize`able shape rather than
//! deriving `Deserialize` directly on the engines' runtime config
//! structs, so the wire format stays stable even if an engine's
//! internal config grows fields that shouldn't be externally tunable.

use std::path::Path;

use concord_negotiation::NegotiationConfig;
use concord_observation::{ObservationManagerConfig, PersistenceConfig};
use concord_orchestrator::OrchestratorConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlignmentGateConfig {
    pub required_aligned_strategies: usize,
    pub min_alignment_confidence: f64,
    pub auto_accept_threshold: f64,
}

impl Default for AlignmentGateConfig {
    fn default() -> Self {
        let d = OrchestratorConfig::default();
        Self { required_aligned_strategies: d.required_aligned_strategies, min_alignment_confidence: d.min_alignment_confidence, auto_accept_threshold: d.auto_accept_threshold }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NegotiationSettings {
    pub default_timeout_seconds: i64,
    pub max_rounds: u32,
    pub max_extensions: u32,
    pub require_validation: bool,
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        let d = NegotiationConfig::default();
        Self { default_timeout_seconds: d.default_timeout_seconds, max_rounds: d.max_rounds, max_extensions: d.max_extensions, require_validation: d.require_validation }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    pub enabled: bool,
    pub directory: String,
    pub gzip: bool,
    pub rotate_bytes: u64,
    pub buffer_capacity: usize,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        let d = PersistenceConfig::default();
        Self { enabled: false, directory: d.directory.to_string_lossy().into_owned(), gzip: d.gzip, rotate_bytes: d.rotate_bytes, buffer_capacity: d.buffer_capacity }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservationSettings {
    pub ring_capacity: usize,
    pub snapshot_interval_seconds: u64,
    pub snapshot_capacity: usize,
    pub alerts_enabled: bool,
    pub alert_ring_capacity: usize,
    pub persistence: PersistenceSettings,
}

impl Default for ObservationSettings {
    fn default() -> Self {
        let d = ObservationManagerConfig::default();
        Self {
            ring_capacity: d.ring_capacity,
            snapshot_interval_seconds: d.snapshot_interval.as_secs(),
            snapshot_capacity: d.snapshot_capacity,
            alerts_enabled: d.alerts_enabled,
            alert_ring_capacity: d.alert_ring_capacity,
            persistence: PersistenceSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub alignment_gate: AlignmentGateConfig,
    pub negotiation: NegotiationSettings,
    pub observation: ObservationSettings,
}

impl ServerConfig {
    /// Loads from `path` if given, else returns all-defaults. A present
    /// but unreadable/malformed file is a startup-time failure (`anyhow`,
    /// per the ambient error-handling convention), not a silently
    /// ignored one.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
                let config: Self = serde_yaml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
                Ok(config)
            }
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            required_aligned_strategies: self.alignment_gate.required_aligned_strategies,
            min_alignment_confidence: self.alignment_gate.min_alignment_confidence,
            auto_accept_threshold: self.alignment_gate.auto_accept_threshold,
            negotiation: NegotiationConfig {
                default_timeout_seconds: self.negotiation.default_timeout_seconds,
                max_rounds: self.negotiation.max_rounds,
                max_extensions: self.negotiation.max_extensions,
                require_validation: self.negotiation.require_validation,
            },
        }
    }

    pub fn observation_config(&self) -> ObservationManagerConfig {
        ObservationManagerConfig {
            ring_capacity: self.observation.ring_capacity,
            snapshot_interval: std::time::Duration::from_secs(self.observation.snapshot_interval_seconds.max(1)),
            snapshot_capacity: self.observation.snapshot_capacity,
            alerts_enabled: self.observation.alerts_enabled,
            alert_ring_capacity: self.observation.alert_ring_capacity,
        }
    }

    pub fn persistence_config(&self) -> Option<PersistenceConfig> {
        if !self.observation.persistence.enabled {
            return None;
        }
        let p = &self.observation.persistence;
        Some(PersistenceConfig { directory: p.directory.clone().into(), gzip: p.gzip, rotate_bytes: p.rotate_bytes, buffer_capacity: p.buffer_capacity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_defaults() {
        let config = ServerConfig::default();
        let orch = config.orchestrator_config();
        assert_eq!(orch.required_aligned_strategies, OrchestratorConfig::default().required_aligned_strategies);
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = "alignment_gate:\n  min_alignment_confidence: 0.8\n";
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.alignment_gate.min_alignment_confidence, 0.8);
        assert_eq!(config.alignment_gate.required_aligned_strategies, AlignmentGateConfig::default().required_aligned_strategies);
    }

    #[test]
    fn persistence_disabled_by_default() {
        let config = ServerConfig::default();
        assert!(config.persistence_config().is_none());
    }
}
