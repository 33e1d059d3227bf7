//! `NegotiationSession` record and its state vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::params::NegotiableParams;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingResponse,
    ProposalReceived,
    CounterReceived,
    AwaitingFinalization,
    Finalizing,
    Finalized,
    Failed,
    TimedOut,
    Closed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Finalized | SessionState::Failed | SessionState::TimedOut | SessionState::Closed)
    }
}

/// Policy applied when a session's deadline elapses before reaching a
/// terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Default. The session moves to `timed_out`.
    Fail,
    /// The session finalizes with `counter_params` if present, else
    /// `proposed_params`. Documented as available but non-default.
    AutoAccept,
    /// The deadline is pushed out by the engine's default timeout,
    /// `extend_count` is incremented, and once `max_extensions` is
    /// exhausted the session falls through to `timed_out`.
    Extend,
}

/// One round of a multi-round counter-proposal exchange, recorded for
/// `get_negotiation_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationRound {
    pub round_number: u32,
    pub proposer: String,
    pub params: NegotiableParams,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationSession {
    pub session_id: String,
    pub initiator_id: String,
    pub responder_id: String,
    pub state: SessionState,
    pub proposed_params: NegotiableParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_params: Option<NegotiableParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_params: Option<NegotiableParams>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub rounds: Vec<NegotiationRound>,
    #[serde(default)]
    pub extend_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub timeout_policy: TimeoutPolicyWrapper,
}

/// `TimeoutPolicy` wrapped with a `Default` impl so the session struct
/// can `#[serde(default)]` it without requiring every constructor call
/// site to spell out `Fail`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TimeoutPolicyWrapper(pub TimeoutPolicy);

impl Default for TimeoutPolicyWrapper {
    fn default() -> Self {
        TimeoutPolicyWrapper(TimeoutPolicy::Fail)
    }
}

impl NegotiationSession {
    pub fn is_participant(&self, agent_id: &str) -> bool {
        self.initiator_id == agent_id || self.responder_id == agent_id
    }

    pub fn duration(&self) -> chrono::Duration {
        self.updated_at - self.created_at
    }
}
