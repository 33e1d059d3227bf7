//! `CollaborationSession`: the orchestrator-level object composing one
//! alignment check plus one negotiation session between two agents.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use concord_alignment::FullAlignmentCheck;
use concord_negotiation::NegotiationSession;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationState {
    Pending,
    Aligning,
    Negotiating,
    Active,
    Evolving,
    Suspended,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_duration_ms: Option<f64>,
    #[serde(default)]
    pub reported: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationSession {
    pub session_id: String,
    pub agent_a_id: String,
    pub agent_b_id: String,
    pub state: CollaborationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_results: Option<FullAlignmentCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiation_session: Option<NegotiationSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_variant_id: Option<String>,
    #[serde(default)]
    pub metrics: SessionMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl CollaborationSession {
    pub fn new(session_id: impl Into<String>, agent_a_id: impl Into<String>, agent_b_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            agent_a_id: agent_a_id.into(),
            agent_b_id: agent_b_id.into(),
            state: CollaborationState::Pending,
            alignment_results: None,
            negotiation_session: None,
            active_variant_id: None,
            metrics: SessionMetrics::default(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    pub fn set_state(&mut self, state: CollaborationState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    pub fn involves(&self, agent_id: &str) -> bool {
        self.agent_a_id == agent_id || self.agent_b_id == agent_id
    }
}
