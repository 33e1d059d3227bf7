//! The Orchestrator: binds the Alignment Scorer, Negotiation State
//! Machine, and Emergence Engine into collaboration sessions, enforces
//! the alignment-before-negotiation gate, and owns the agent registry.
//!
//! Agent registry and session map live behind one mutex, per the
//! concurrency design. Engines are called synchronously and return
//! before a session transition advances; hook exceptions are swallowed
//! and never affect session state.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use concord_alignment::{AlignmentScorer, FullAlignmentCheck};
use concord_core::{AgentDescriptor, ConcordError, ConcordResult, FlowType, Severity};
use concord_emergence::{EmergenceEngine, ProtocolVariant};
use concord_negotiation::{NegotiableParams, NegotiationConfig, NegotiationEngine, TimeoutPolicy};
use concord_observation::{FlowEvent, SharedBus};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::hooks::Hooks;
use crate::registry::AgentRegistry;
use crate::session::{CollaborationSession, CollaborationState};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub required_aligned_strategies: usize,
    pub min_alignment_confidence: f64,
    pub auto_accept_threshold: f64,
    pub negotiation: NegotiationConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            required_aligned_strategies: 3,
            min_alignment_confidence: 0.6,
            auto_accept_threshold: 0.9,
            negotiation: NegotiationConfig::default(),
        }
    }
}

/// Caller's reply to a received proposal, dispatched to the negotiation
/// engine's `respond_*` family by `complete_negotiation`.
#[derive(Debug, Clone)]
pub enum NegotiationResponse {
    Accept,
    Counter(NegotiableParams),
    Reject(String),
}

struct OrchestratorState {
    registry: AgentRegistry,
    sessions: HashMap<String, CollaborationSession>,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    scorer: AlignmentScorer,
    negotiation: NegotiationEngine,
    emergence: EmergenceEngine,
    bus: Option<SharedBus>,
    hooks: Hooks,
    state: Mutex<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, bus: Option<SharedBus>) -> Self {
        let negotiation = NegotiationEngine::new(config.negotiation.clone());
        Self {
            config,
            scorer: AlignmentScorer::new(),
            negotiation,
            emergence: EmergenceEngine::default(),
            bus,
            hooks: Hooks::default(),
            state: Mutex::new(OrchestratorState { registry: AgentRegistry::new(), sessions: HashMap::new() }),
        }
    }

    pub fn scorer(&self) -> &AlignmentScorer {
        &self.scorer
    }

    pub fn negotiation(&self) -> &NegotiationEngine {
        &self.negotiation
    }

    pub fn emergence(&self) -> &EmergenceEngine {
        &self.emergence
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    fn publish(&self, event: FlowEvent) {
        if let Some(bus) = &self.bus {
            bus.publish(event);
        }
    }

    // --- Agent registry --------------------------------------------------

    pub fn register_agent(&self, descriptor: AgentDescriptor) -> AgentDescriptor {
        self.scorer.observe_agent(&descriptor);
        let agent_id = descriptor.agent_id.clone();
        let registered = self.state.lock().registry.register(descriptor);
        self.publish(
            FlowEvent::new(FlowType::AgentLifecycle, "agent_registered", Severity::Info, format!("agent {agent_id} registered"))
                .with_source_agent(agent_id),
        );
        registered
    }

    pub fn get_agent(&self, agent_id: &str) -> ConcordResult<AgentDescriptor> {
        self.state.lock().registry.get(agent_id)
    }

    pub fn update_agent(&self, descriptor: AgentDescriptor) -> ConcordResult<AgentDescriptor> {
        self.scorer.observe_agent(&descriptor);
        self.state.lock().registry.update(descriptor)
    }

    pub fn deregister_agent(&self, agent_id: &str) -> ConcordResult<()> {
        self.state.lock().registry.deregister(agent_id)
    }

    fn require_agent(state: &OrchestratorState, agent_id: &str) -> ConcordResult<AgentDescriptor> {
        state.registry.get(agent_id)
    }

    // --- Collaboration sessions -------------------------------------------

    fn alignment_score(check: &FullAlignmentCheck) -> f64 {
        (check.aligned_count() as f64 + 0.5 * check.partial_count() as f64) / 5.0
    }

    /// Suggests `data_format`/`max_message_size`/`streaming_enabled`
    /// upgrades for callers whose alignment is strong enough to warrant
    /// skipping a manual negotiation round.
    fn capability_aware_upgrade(mut params: NegotiableParams, a: &AgentDescriptor, b: &AgentDescriptor) -> NegotiableParams {
        if a.has_capability("msgpack") && b.has_capability("msgpack") {
            params.data_format = "msgpack".to_string();
        }
        if a.has_capability("high_throughput") && b.has_capability("high_throughput") {
            params.max_message_size = (params.max_message_size * 4).min(concord_negotiation::params::MAX_MAX_MESSAGE_SIZE);
        }
        if a.has_capability("streaming") && b.has_capability("streaming") {
            params.streaming_enabled = true;
        }
        params
    }

    #[instrument(skip(self, proposed_params, metadata))]
    pub fn initiate_collaboration(
        &self,
        agent_a_id: &str,
        agent_b_id: &str,
        required_domains: Option<Vec<String>>,
        proposed_params: Option<NegotiableParams>,
        metadata: HashMap<String, Value>,
    ) -> ConcordResult<CollaborationSession> {
        let (agent_a, agent_b) = {
            let state = self.state.lock();
            (Self::require_agent(&state, agent_a_id)?, Self::require_agent(&state, agent_b_id)?)
        };

        let session_id = Uuid::new_v4().to_string();
        let mut session = CollaborationSession::new(&session_id, agent_a_id, agent_b_id);
        session.metadata = metadata;
        session.set_state(CollaborationState::Aligning);

        let started = Instant::now();
        let check = self.scorer.full_alignment_check(&agent_a, &agent_b, required_domains.as_deref(), None);
        session.metrics.alignment_duration_ms = Some(started.elapsed().as_secs_f64() * 1000.0);
        session.alignment_results = Some(check.clone());
        self.hooks.fire_alignment_complete(&session, &check);
        self.publish(
            FlowEvent::new(FlowType::Alignment, "alignment_checked", Severity::Info, "full alignment check completed")
                .with_source_agent(agent_a_id)
                .with_target_agent(agent_b_id)
                .with_session_id(&session_id)
                .with_metric("weighted_score", check.summary.weighted_score),
        );

        let score = Self::alignment_score(&check);
        let gate_passes = check.aligned_count() >= self.config.required_aligned_strategies && score >= self.config.min_alignment_confidence;

        if !gate_passes {
            session.set_state(CollaborationState::Failed);
            session.metadata.insert("failure_reason".to_string(), Value::String("Insufficient alignment".to_string()));
            let reason = format!("score {score:.2} with {} aligned strategies", check.aligned_count());
            self.publish(
                FlowEvent::new(FlowType::Collaboration, "collaboration_failed", Severity::Warning, "alignment gate failed")
                    .with_session_id(&session_id)
                    .with_metric("score", score),
            );
            self.state.lock().sessions.insert(session_id.clone(), session);
            return Err(ConcordError::insufficient_alignment(reason));
        }

        session.set_state(CollaborationState::Negotiating);
        let mut params = proposed_params.unwrap_or_default();
        if score >= self.config.auto_accept_threshold {
            params = Self::capability_aware_upgrade(params, &agent_a, &agent_b);
        }
        let negotiation = self.negotiation.initiate_session(agent_a_id, agent_b_id, params, TimeoutPolicy::Fail)?;
        session.negotiation_session = Some(negotiation);

        session.set_state(CollaborationState::Active);
        self.hooks.fire_session_ready(&session);
        self.publish(
            FlowEvent::new(FlowType::Collaboration, "collaboration_active", Severity::Info, "collaboration session active")
                .with_source_agent(agent_a_id)
                .with_target_agent(agent_b_id)
                .with_session_id(&session_id),
        );

        self.state.lock().sessions.insert(session_id.clone(), session.clone());
        Ok(session)
    }

    pub fn check_collaboration_readiness(&self, session_id: &str) -> ConcordResult<bool> {
        let session = self.get_collaboration_status(session_id)?;
        Ok(matches!(session.state, CollaborationState::Active | CollaborationState::Evolving))
    }

    fn with_session<F>(&self, session_id: &str, f: F) -> ConcordResult<CollaborationSession>
    where
        F: FnOnce(&mut CollaborationSession) -> ConcordResult<()>,
    {
        let mut state = self.state.lock();
        let session = state.sessions.get_mut(session_id).ok_or_else(|| ConcordError::not_found(format!("collaboration session {session_id}")))?;
        f(session)?;
        Ok(session.clone())
    }

    #[instrument(skip(self, response))]
    pub fn complete_negotiation(
        &self,
        session_id: &str,
        responder_id: &str,
        response: NegotiationResponse,
    ) -> ConcordResult<CollaborationSession> {
        let negotiation_id = self.get_collaboration_status(session_id)?.negotiation_session.ok_or_else(|| {
            ConcordError::illegal_transition(format!("collaboration session {session_id} has no negotiation session"))
        })?.session_id;

        if self.negotiation.get_status(&negotiation_id)?.state == concord_negotiation::SessionState::AwaitingResponse {
            self.negotiation.receive_proposal(&negotiation_id, responder_id)?;
        }

        let updated = match response {
            NegotiationResponse::Accept => self.negotiation.respond_accept(&negotiation_id, responder_id)?,
            NegotiationResponse::Counter(params) => self.negotiation.respond_counter(&negotiation_id, responder_id, params)?,
            NegotiationResponse::Reject(reason) => self.negotiation.respond_reject(&negotiation_id, responder_id, reason)?,
        };

        self.publish(
            FlowEvent::new(FlowType::Negotiation, "negotiation_responded", Severity::Info, "negotiation response recorded")
                .with_session_id(session_id),
        );

        let result = self.with_session(session_id, |session| {
            session.negotiation_session = Some(updated.clone());
            session.updated_at = Utc::now();
            Ok(())
        })?;
        self.hooks.fire_negotiation_complete(&result, &updated);
        Ok(result)
    }

    pub fn accept_counter_and_finalize(&self, session_id: &str, initiator_id: &str) -> ConcordResult<CollaborationSession> {
        let negotiation_id = self.get_collaboration_status(session_id)?.negotiation_session.ok_or_else(|| {
            ConcordError::illegal_transition(format!("collaboration session {session_id} has no negotiation session"))
        })?.session_id;

        self.negotiation.accept_counter(&negotiation_id, initiator_id)?;
        let finalized = self.negotiation.finalize_session(&negotiation_id, initiator_id)?;

        let result = self.with_session(session_id, |session| {
            session.negotiation_session = Some(finalized.clone());
            session.set_state(CollaborationState::Active);
            Ok(())
        })?;
        self.hooks.fire_negotiation_complete(&result, &finalized);
        self.publish(
            FlowEvent::new(FlowType::Negotiation, "negotiation_finalized", Severity::Info, "negotiation finalized")
                .with_session_id(session_id),
        );
        Ok(result)
    }

    #[instrument(skip(self, changes))]
    pub fn propose_protocol_evolution(
        &self,
        session_id: &str,
        description: impl Into<String>,
        changes: HashMap<String, Value>,
    ) -> ConcordResult<ProtocolVariant> {
        // Validate the session exists before touching the emergence engine.
        self.get_collaboration_status(session_id)?;
        let variant = self.emergence.propose_variant(description, changes, None, vec![], HashMap::new());

        let result = self.with_session(session_id, |session| {
            session.set_state(CollaborationState::Evolving);
            session.active_variant_id = Some(variant.variant_id.clone());
            Ok(())
        })?;
        self.hooks.fire_evolution_triggered(&result, &variant);
        self.publish(
            FlowEvent::new(FlowType::Emergence, "evolution_proposed", Severity::Info, "protocol evolution proposed")
                .with_session_id(session_id)
                .with_metric("variant_id", variant.variant_id.clone()),
        );
        Ok(variant)
    }

    pub fn evolve_session_protocol(&self, session_id: &str, variant_id: &str) -> ConcordResult<CollaborationSession> {
        let variant = self.emergence.get_variant_status(variant_id)?;
        let is_settled = matches!(
            variant.status,
            concord_emergence::VariantStatus::Active | concord_emergence::VariantStatus::RolledBack
        );
        self.with_session(session_id, |session| {
            session.active_variant_id = Some(variant_id.to_string());
            if is_settled {
                session.set_state(CollaborationState::Active);
            }
            Ok(())
        })
    }

    pub fn report_session_metrics(&self, session_id: &str, metrics: HashMap<String, Value>) -> ConcordResult<CollaborationSession> {
        self.with_session(session_id, |session| {
            session.metrics.reported.extend(metrics);
            Ok(())
        })
    }

    pub fn get_collaboration_status(&self, session_id: &str) -> ConcordResult<CollaborationSession> {
        self.state.lock().sessions.get(session_id).cloned().ok_or_else(|| ConcordError::not_found(format!("collaboration session {session_id}")))
    }

    pub fn list_active_collaborations(&self) -> Vec<CollaborationSession> {
        self.state
            .lock()
            .sessions
            .values()
            .filter(|s| !matches!(s.state, CollaborationState::Completed | CollaborationState::Failed))
            .cloned()
            .collect()
    }

    pub fn suspend_session(&self, session_id: &str) -> ConcordResult<CollaborationSession> {
        self.with_session(session_id, |session| {
            session.set_state(CollaborationState::Suspended);
            Ok(())
        })
    }

    pub fn resume_session(&self, session_id: &str) -> ConcordResult<CollaborationSession> {
        self.with_session(session_id, |session| {
            if session.state != CollaborationState::Suspended {
                return Err(ConcordError::illegal_transition(format!("cannot resume from {:?}", session.state)));
            }
            session.set_state(CollaborationState::Active);
            Ok(())
        })
    }

    pub fn close_session(&self, session_id: &str) -> ConcordResult<CollaborationSession> {
        self.with_session(session_id, |session| {
            session.set_state(CollaborationState::Completed);
            Ok(())
        })
    }

    pub fn end_collaboration(&self, session_id: &str) -> ConcordResult<CollaborationSession> {
        let result = self.close_session(session_id)?;
        info!(session_id, "collaboration ended");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, domains: &[&str], goal_type: &str) -> AgentDescriptor {
        let mut a = AgentDescriptor::new(id);
        a.knowledge_domains = domains.iter().map(|s| s.to_string()).collect();
        a.goals = vec![concord_core::Goal::new(goal_type)];
        a.context_params.insert("env".to_string(), serde_json::json!("dev"));
        a
    }

    #[test]
    fn s1_happy_path_collaboration() {
        let orch = Orchestrator::new(OrchestratorConfig::default(), None);
        orch.register_agent(agent("A", &["python", "ml"], "assistance"));
        orch.register_agent(agent("B", &["python", "data_science"], "analysis"));

        let session = orch.initiate_collaboration("A", "B", None, None, HashMap::new()).unwrap();
        assert_eq!(session.state, CollaborationState::Active);
        let score = Orchestrator::alignment_score(session.alignment_results.as_ref().unwrap());
        assert!(score >= 0.6);
        assert_eq!(
            session.negotiation_session.as_ref().unwrap().state,
            concord_negotiation::SessionState::AwaitingResponse
        );
    }

    #[test]
    fn s2_alignment_gate_fails() {
        let orch = Orchestrator::new(OrchestratorConfig::default(), None);
        orch.register_agent(agent("A", &["cooking"], "assistance"));
        orch.register_agent(agent("B", &["astronomy"], "assistance"));

        let required = Some(vec!["quantum_computing".to_string()]);
        let err = orch.initiate_collaboration("A", "B", required, None, HashMap::new()).unwrap_err();
        assert!(matches!(err, ConcordError::InsufficientAlignment(_)));

        let sessions = orch.list_active_collaborations();
        assert!(sessions.is_empty());
    }

    #[test]
    fn s3_counter_and_finalize() {
        let orch = Orchestrator::new(OrchestratorConfig::default(), None);
        orch.register_agent(agent("A", &["python", "ml"], "assistance"));
        orch.register_agent(agent("B", &["python", "data_science"], "analysis"));
        let session = orch.initiate_collaboration("A", "B", None, None, HashMap::new()).unwrap();

        let mut counter = NegotiableParams::default();
        counter.compression = "lz4".to_string();
        let updated = orch.complete_negotiation(&session.session_id, "B", NegotiationResponse::Counter(counter)).unwrap();
        assert_eq!(updated.negotiation_session.as_ref().unwrap().state, concord_negotiation::SessionState::AwaitingFinalization);

        let finalized = orch.accept_counter_and_finalize(&session.session_id, "A").unwrap();
        let final_params = finalized.negotiation_session.as_ref().unwrap().final_params.clone().unwrap();
        assert_eq!(final_params.compression, "lz4");
    }

    #[test]
    fn missing_agent_is_not_found() {
        let orch = Orchestrator::new(OrchestratorConfig::default(), None);
        orch.register_agent(agent("A", &["python"], "assistance"));
        let err = orch.initiate_collaboration("A", "ghost", None, None, HashMap::new()).unwrap_err();
        assert!(matches!(err, ConcordError::NotFound(_)));
    }
}
