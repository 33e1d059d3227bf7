//! Shared application state: one `Orchestrator`, the `WorkflowRunner`
//! that drives it, and the `ObservationManager` both publish events to.
//! Built once per process and handed to every transport/command.

use std::sync::Arc;

use concord_negotiation::NegotiationConfig;
use concord_observation::{ObservationManager, ObservationManagerConfig, PersistenceConfig, PersistenceSink};
use concord_orchestrator::{Orchestrator, OrchestratorConfig};
use concord_workflows::WorkflowRunner;
use tracing::warn;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub workflows: Arc<WorkflowRunner>,
    pub observation: Arc<ObservationManager>,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Self::with_config(OrchestratorConfig { negotiation: NegotiationConfig::default(), ..OrchestratorConfig::default() }, ObservationManagerConfig::default(), None)
    }

    pub fn with_config(orchestrator_config: OrchestratorConfig, observation_config: ObservationManagerConfig, persistence_config: Option<PersistenceConfig>) -> Arc<Self> {
        let observation = ObservationManager::new(observation_config);
        if let Some(persistence_config) = persistence_config {
            match PersistenceSink::new(persistence_config) {
                Ok(sink) => observation.enable_persistence(sink),
                Err(e) => warn!(error = %e, "failed to initialize observation persistence sink, continuing without it"),
            }
        }
        observation.start();
        let orchestrator = Arc::new(Orchestrator::new(orchestrator_config, Some(observation.bus.clone())));
        let workflows = Arc::new(WorkflowRunner::new(orchestrator.clone()));
        Arc::new(Self { orchestrator, workflows, observation })
    }

    pub async fn shutdown(&self) {
        self.observation.stop().await;
    }
}
