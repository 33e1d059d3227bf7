//! The Negotiation State Machine: a session-scoped engine for proposing,
//! countering, finalizing, or timing out communication parameters.
//!
//! All state lives behind a single `parking_lot::Mutex`, per the
//! one-mutex-per-engine concurrency rule. Every public method locks,
//! mutates, and unlocks before returning — this crate has no bus
//! dependency, so it never invokes callbacks while holding the lock; the
//! orchestrator publishes events based on the `NegotiationSession`
//! snapshots this engine returns.

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use concord_core::{ConcordError, ConcordResult};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::analytics::{self, NegotiationAnalytics};
use crate::optimize::{self, OptimizationPriority};
use crate::params::NegotiableParams;
use crate::session::{NegotiationRound, NegotiationSession, SessionState, TimeoutPolicy, TimeoutPolicyWrapper};

#[derive(Debug, Clone)]
pub struct NegotiationConfig {
    pub default_timeout_seconds: i64,
    pub max_rounds: u32,
    pub max_extensions: u32,
    pub require_validation: bool,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: 300,
            max_rounds: 10,
            max_extensions: 3,
            require_validation: true,
        }
    }
}

struct EngineState {
    active: HashMap<String, NegotiationSession>,
    completed: Vec<NegotiationSession>,
    param_contests: HashMap<String, u64>,
}

pub struct NegotiationEngine {
    config: NegotiationConfig,
    inner: Mutex<EngineState>,
}

impl Default for NegotiationEngine {
    fn default() -> Self {
        Self::new(NegotiationConfig::default())
    }
}

impl NegotiationEngine {
    pub fn new(config: NegotiationConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(EngineState { active: HashMap::new(), completed: Vec::new(), param_contests: HashMap::new() }),
        }
    }

    fn validate_if_required(&self, params: &NegotiableParams) -> ConcordResult<()> {
        if self.config.require_validation {
            params.validate()?;
        }
        Ok(())
    }

    #[instrument(skip(self, proposed_params))]
    pub fn initiate_session(
        &self,
        initiator_id: impl Into<String>,
        responder_id: impl Into<String>,
        proposed_params: NegotiableParams,
        timeout_policy: TimeoutPolicy,
    ) -> ConcordResult<NegotiationSession> {
        self.validate_if_required(&proposed_params)?;
        let now = Utc::now();
        let session = NegotiationSession {
            session_id: Uuid::new_v4().to_string(),
            initiator_id: initiator_id.into(),
            responder_id: responder_id.into(),
            state: SessionState::AwaitingResponse,
            proposed_params,
            counter_params: None,
            final_params: None,
            created_at: now,
            updated_at: now,
            expires_at: now + ChronoDuration::seconds(self.config.default_timeout_seconds),
            rounds: Vec::new(),
            extend_count: 0,
            alignment_score: None,
            failure_reason: None,
            timeout_policy: TimeoutPolicyWrapper(timeout_policy),
        };
        info!(session_id = %session.session_id, initiator = %session.initiator_id, responder = %session.responder_id, "negotiation session initiated");
        let mut inner = self.inner.lock();
        inner.active.insert(session.session_id.clone(), session.clone());
        Ok(session)
    }

    fn get_active_mut<'a>(inner: &'a mut EngineState, session_id: &str) -> ConcordResult<&'a mut NegotiationSession> {
        inner.active.get_mut(session_id).ok_or_else(|| ConcordError::not_found(format!("negotiation session {session_id}")))
    }

    fn require_responder(session: &NegotiationSession, caller: &str) -> ConcordResult<()> {
        if session.responder_id != caller {
            return Err(ConcordError::not_participant(caller));
        }
        Ok(())
    }

    fn require_initiator(session: &NegotiationSession, caller: &str) -> ConcordResult<()> {
        if session.initiator_id != caller {
            return Err(ConcordError::not_participant(caller));
        }
        Ok(())
    }

    fn require_participant(session: &NegotiationSession, caller: &str) -> ConcordResult<()> {
        if !session.is_participant(caller) {
            return Err(ConcordError::not_participant(caller));
        }
        Ok(())
    }

    pub fn receive_proposal(&self, session_id: &str, responder_id: &str) -> ConcordResult<NegotiationSession> {
        let mut inner = self.inner.lock();
        let session = Self::get_active_mut(&mut inner, session_id)?;
        Self::require_responder(session, responder_id)?;
        if session.state != SessionState::AwaitingResponse {
            return Err(ConcordError::illegal_transition(format!("cannot receive_proposal from state {:?}", session.state)));
        }
        session.state = SessionState::ProposalReceived;
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    pub fn respond_accept(&self, session_id: &str, responder_id: &str) -> ConcordResult<NegotiationSession> {
        let mut inner = self.inner.lock();
        let session = Self::get_active_mut(&mut inner, session_id)?;
        Self::require_responder(session, responder_id)?;
        if !matches!(session.state, SessionState::ProposalReceived | SessionState::CounterReceived) {
            return Err(ConcordError::illegal_transition(format!("cannot respond_accept from state {:?}", session.state)));
        }
        session.state = SessionState::AwaitingFinalization;
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    #[instrument(skip(self, counter_params))]
    pub fn respond_counter(&self, session_id: &str, responder_id: &str, counter_params: NegotiableParams) -> ConcordResult<NegotiationSession> {
        self.validate_if_required(&counter_params)?;
        let mut inner = self.inner.lock();
        let session = Self::get_active_mut(&mut inner, session_id)?;
        Self::require_responder(session, responder_id)?;
        if !matches!(session.state, SessionState::ProposalReceived | SessionState::CounterReceived) {
            return Err(ConcordError::illegal_transition(format!("cannot respond_counter from state {:?}", session.state)));
        }
        if let Some(reason) = session.proposed_params.incompatible_with(&counter_params) {
            return Err(ConcordError::validation(reason));
        }
        session.counter_params = Some(counter_params.clone());
        session.state = SessionState::AwaitingFinalization;
        session.updated_at = Utc::now();
        let round = NegotiationRound {
            round_number: session.rounds.len() as u32 + 1,
            proposer: responder_id.to_string(),
            params: counter_params,
            timestamp: Utc::now(),
        };
        session.rounds.push(round);
        Ok(session.clone())
    }

    pub fn respond_reject(&self, session_id: &str, responder_id: &str, reason: impl Into<String>) -> ConcordResult<NegotiationSession> {
        let mut inner = self.inner.lock();
        let session = Self::get_active_mut(&mut inner, session_id)?;
        Self::require_responder(session, responder_id)?;
        if !matches!(session.state, SessionState::ProposalReceived | SessionState::CounterReceived) {
            return Err(ConcordError::illegal_transition(format!("cannot respond_reject from state {:?}", session.state)));
        }
        session.state = SessionState::Failed;
        session.failure_reason = Some(reason.into());
        session.updated_at = Utc::now();
        self.archive(&mut inner, session_id);
        Ok(inner.completed.last().cloned().expect("just archived"))
    }

    /// Multi-round counter submission, bounded by `max_rounds`. Either
    /// participant may submit; exhausting `max_rounds` is an illegal
    /// transition rather than a silent no-op.
    #[instrument(skip(self, params))]
    pub fn submit_counter_proposal(&self, session_id: &str, proposer_id: &str, params: NegotiableParams) -> ConcordResult<NegotiationSession> {
        self.validate_if_required(&params)?;
        let mut inner = self.inner.lock();
        let session = Self::get_active_mut(&mut inner, session_id)?;
        Self::require_participant(session, proposer_id)?;
        if !matches!(session.state, SessionState::ProposalReceived | SessionState::CounterReceived | SessionState::AwaitingResponse) {
            return Err(ConcordError::illegal_transition(format!("cannot submit_counter_proposal from state {:?}", session.state)));
        }
        if session.rounds.len() as u32 >= self.config.max_rounds {
            return Err(ConcordError::illegal_transition(format!("max_rounds ({}) exhausted", self.config.max_rounds)));
        }
        if let Some(reason) = session.proposed_params.incompatible_with(&params) {
            return Err(ConcordError::validation(reason));
        }
        session.counter_params = Some(params.clone());
        session.state = SessionState::CounterReceived;
        session.updated_at = Utc::now();
        session.rounds.push(NegotiationRound {
            round_number: session.rounds.len() as u32 + 1,
            proposer: proposer_id.to_string(),
            params,
            timestamp: Utc::now(),
        });
        Ok(session.clone())
    }

    pub fn accept_counter(&self, session_id: &str, initiator_id: &str) -> ConcordResult<NegotiationSession> {
        let mut inner = self.inner.lock();
        let session = Self::get_active_mut(&mut inner, session_id)?;
        Self::require_initiator(session, initiator_id)?;
        if session.state != SessionState::AwaitingFinalization {
            return Err(ConcordError::illegal_transition(format!("cannot accept_counter from state {:?}", session.state)));
        }
        if session.counter_params.is_none() {
            return Err(ConcordError::illegal_transition("no counter proposal to accept"));
        }
        session.state = SessionState::Finalizing;
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    pub fn finalize_session(&self, session_id: &str, initiator_id: &str) -> ConcordResult<NegotiationSession> {
        let mut inner = self.inner.lock();
        let session = Self::get_active_mut(&mut inner, session_id)?;
        Self::require_initiator(session, initiator_id)?;
        if !matches!(session.state, SessionState::AwaitingFinalization | SessionState::Finalizing) {
            return Err(ConcordError::illegal_transition(format!("cannot finalize_session from state {:?}", session.state)));
        }
        session.final_params = Some(session.counter_params.clone().unwrap_or_else(|| session.proposed_params.clone()));
        session.state = SessionState::Finalized;
        session.updated_at = Utc::now();
        self.archive(&mut inner, session_id);
        Ok(inner.completed.last().cloned().expect("just archived"))
    }

    pub fn close_session(&self, session_id: &str, caller_id: &str) -> ConcordResult<NegotiationSession> {
        let mut inner = self.inner.lock();
        let session = Self::get_active_mut(&mut inner, session_id)?;
        Self::require_participant(session, caller_id)?;
        if session.state.is_terminal() {
            return Err(ConcordError::illegal_transition(format!("session already terminal: {:?}", session.state)));
        }
        session.state = SessionState::Closed;
        session.updated_at = Utc::now();
        self.archive(&mut inner, session_id);
        Ok(inner.completed.last().cloned().expect("just archived"))
    }

    /// Idempotent: terminal sessions and sessions not yet past their
    /// deadline are untouched.
    pub fn check_timeout(&self, session_id: &str) -> ConcordResult<Option<NegotiationSession>> {
        let mut inner = self.inner.lock();
        let Some(session) = inner.active.get(session_id) else {
            if inner.completed.iter().any(|s| s.session_id == session_id) {
                return Ok(None);
            }
            return Err(ConcordError::not_found(format!("negotiation session {session_id}")));
        };
        if session.state.is_terminal() || Utc::now() < session.expires_at {
            return Ok(None);
        }

        let policy = session.timeout_policy.0;
        match policy {
            TimeoutPolicy::Fail => {
                let session = inner.active.get_mut(session_id).expect("checked above");
                session.state = SessionState::TimedOut;
                session.updated_at = Utc::now();
                session.failure_reason = Some("session expired past deadline".to_string());
                self.archive(&mut inner, session_id);
                Ok(inner.completed.last().cloned())
            }
            TimeoutPolicy::AutoAccept => {
                let session = inner.active.get_mut(session_id).expect("checked above");
                session.final_params = Some(session.counter_params.clone().unwrap_or_else(|| session.proposed_params.clone()));
                session.state = SessionState::Finalized;
                session.updated_at = Utc::now();
                self.archive(&mut inner, session_id);
                Ok(inner.completed.last().cloned())
            }
            TimeoutPolicy::Extend => {
                let max_extensions = self.config.max_extensions;
                let default_timeout = self.config.default_timeout_seconds;
                let session = inner.active.get_mut(session_id).expect("checked above");
                if session.extend_count >= max_extensions {
                    session.state = SessionState::TimedOut;
                    session.updated_at = Utc::now();
                    session.failure_reason = Some("extensions exhausted".to_string());
                    self.archive(&mut inner, session_id);
                    Ok(inner.completed.last().cloned())
                } else {
                    session.extend_count += 1;
                    session.expires_at = Utc::now() + ChronoDuration::seconds(default_timeout);
                    session.updated_at = Utc::now();
                    Ok(Some(session.clone()))
                }
            }
        }
    }

    /// Sweeps every active session through `check_timeout`, returning the
    /// sessions that changed state.
    pub fn check_all_timeouts(&self) -> Vec<NegotiationSession> {
        let ids: Vec<String> = {
            let inner = self.inner.lock();
            inner.active.keys().cloned().collect()
        };
        let mut changed = Vec::new();
        for id in ids {
            if let Ok(Some(session)) = self.check_timeout(&id) {
                changed.push(session);
            }
        }
        changed
    }

    pub fn get_status(&self, session_id: &str) -> ConcordResult<NegotiationSession> {
        let inner = self.inner.lock();
        if let Some(s) = inner.active.get(session_id) {
            return Ok(s.clone());
        }
        inner
            .completed
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned()
            .ok_or_else(|| ConcordError::not_found(format!("negotiation session {session_id}")))
    }

    pub fn list_sessions(&self, agent_id: Option<&str>) -> Vec<NegotiationSession> {
        let inner = self.inner.lock();
        inner
            .active
            .values()
            .chain(inner.completed.iter())
            .filter(|s| agent_id.map_or(true, |id| s.is_participant(id)))
            .cloned()
            .collect()
    }

    pub fn get_history(&self, session_id: &str) -> ConcordResult<Vec<NegotiationRound>> {
        Ok(self.get_status(session_id)?.rounds)
    }

    pub fn get_analytics(&self, agent_id: Option<&str>) -> NegotiationAnalytics {
        let inner = self.inner.lock();
        analytics::compute(&inner.completed, agent_id, &inner.param_contests)
    }

    /// Merges `proposed_params` and `counter_params` per the component
    /// design's field-wise rules, preferring the initiator's side on
    /// caller-preference ties (`data_format`, `error_correction`,
    /// `retry_policy`, `custom_params` key conflicts). Tallies each
    /// differing field into `param_contests` for `get_analytics`'s
    /// top-contested-params ranking.
    pub fn auto_resolve(&self, session_id: &str) -> ConcordResult<NegotiableParams> {
        let session = self.get_status(session_id)?;
        let counter = match &session.counter_params {
            Some(c) => c,
            None => return Ok(session.proposed_params),
        };
        let contests = self.record_contests(&session.proposed_params, counter);
        for key in contests {
            self.bump_contest(&key);
        }
        Ok(session.proposed_params.merge_with(counter, true))
    }

    pub fn suggest_optimal_params(
        capabilities_a: &HashMap<String, Value>,
        capabilities_b: &HashMap<String, Value>,
        priority: OptimizationPriority,
    ) -> NegotiableParams {
        optimize::suggest_optimal_params(capabilities_a, capabilities_b, priority)
    }

    fn record_contests(&self, proposed: &NegotiableParams, counter: &NegotiableParams) -> Vec<String> {
        let mut contested = Vec::new();
        if proposed.data_format != counter.data_format {
            contested.push("data_format".to_string());
        }
        if proposed.compression != counter.compression {
            contested.push("compression".to_string());
        }
        if proposed.encryption != counter.encryption {
            contested.push("encryption".to_string());
        }
        if proposed.error_correction != counter.error_correction {
            contested.push("error_correction".to_string());
        }
        if proposed.max_message_size != counter.max_message_size {
            contested.push("max_message_size".to_string());
        }
        if proposed.timeout_ms != counter.timeout_ms {
            contested.push("timeout_ms".to_string());
        }
        if proposed.streaming_enabled != counter.streaming_enabled {
            contested.push("streaming_enabled".to_string());
        }
        if proposed.batch_size != counter.batch_size {
            contested.push("batch_size".to_string());
        }
        if proposed.priority != counter.priority {
            contested.push("priority".to_string());
        }
        contested
    }

    fn bump_contest(&self, key: &str) {
        let mut inner = self.inner.lock();
        *inner.param_contests.entry(key.to_string()).or_insert(0) += 1;
    }

    /// Moves a session from `active` into `completed`. Caller must hold
    /// the lock and have already set a terminal state.
    fn archive(&self, inner: &mut EngineState, session_id: &str) {
        if let Some(session) = inner.active.remove(session_id) {
            if !session.state.is_terminal() {
                warn!(session_id, "archiving a session that is not in a terminal state");
            }
            inner.completed.push(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> NegotiationEngine {
        NegotiationEngine::default()
    }

    #[test]
    fn happy_path_finalizes_with_counter_params() {
        let eng = engine();
        let session = eng.initiate_session("A", "B", NegotiableParams::default(), TimeoutPolicy::Fail).unwrap();
        eng.receive_proposal(&session.session_id, "B").unwrap();
        let mut counter = NegotiableParams::default();
        counter.compression = "lz4".to_string();
        eng.respond_counter(&session.session_id, "B", counter.clone()).unwrap();
        eng.accept_counter(&session.session_id, "A").unwrap();
        let finalized = eng.finalize_session(&session.session_id, "A").unwrap();
        assert_eq!(finalized.state, SessionState::Finalized);
        assert_eq!(finalized.final_params.unwrap().compression, "lz4");
    }

    #[test]
    fn non_participant_is_rejected() {
        let eng = engine();
        let session = eng.initiate_session("A", "B", NegotiableParams::default(), TimeoutPolicy::Fail).unwrap();
        let err = eng.respond_accept(&session.session_id, "C").unwrap_err();
        assert!(matches!(err, ConcordError::NotParticipant(_)));
    }

    #[test]
    fn illegal_transition_does_not_mutate_state() {
        let eng = engine();
        let session = eng.initiate_session("A", "B", NegotiableParams::default(), TimeoutPolicy::Fail).unwrap();
        let err = eng.accept_counter(&session.session_id, "A").unwrap_err();
        assert!(matches!(err, ConcordError::IllegalTransition(_)));
        let status = eng.get_status(&session.session_id).unwrap();
        assert_eq!(status.state, SessionState::AwaitingResponse);
    }

    #[test]
    fn repeated_timeout_checks_after_terminal_are_idempotent() {
        let eng = engine();
        let session = eng.initiate_session("A", "B", NegotiableParams::default(), TimeoutPolicy::Fail).unwrap();
        eng.respond_reject(&session.session_id, "B", "not interested").unwrap();
        assert_eq!(eng.check_timeout(&session.session_id).unwrap(), None);
        assert_eq!(eng.check_timeout(&session.session_id).unwrap(), None);
        let status = eng.get_status(&session.session_id).unwrap();
        assert_eq!(status.state, SessionState::Failed);
    }

    #[test]
    fn auto_resolve_merges_proposed_and_counter() {
        let eng = engine();
        let session = eng.initiate_session("A", "B", NegotiableParams::default(), TimeoutPolicy::Fail).unwrap();
        eng.receive_proposal(&session.session_id, "B").unwrap();
        let mut counter = NegotiableParams::default();
        counter.max_message_size = 2048;
        eng.respond_counter(&session.session_id, "B", counter).unwrap();
        let resolved = eng.auto_resolve(&session.session_id).unwrap();
        assert_eq!(resolved.max_message_size, 2048.min(NegotiableParams::default().max_message_size));
    }

    #[test]
    fn auto_resolve_tallies_contested_params_for_analytics() {
        let eng = engine();
        let session = eng.initiate_session("A", "B", NegotiableParams::default(), TimeoutPolicy::Fail).unwrap();
        eng.receive_proposal(&session.session_id, "B").unwrap();
        let mut counter = NegotiableParams::default();
        counter.max_message_size = 2048;
        eng.respond_counter(&session.session_id, "B", counter).unwrap();
        eng.auto_resolve(&session.session_id).unwrap();
        let analytics = eng.get_analytics(None);
        assert!(analytics.top_contested_params.iter().any(|(name, count)| name == "max_message_size" && *count == 1));
    }
}
