//! Agent descriptors — the unit every alignment, negotiation, and
//! orchestration operation is computed over.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A goal declared by an agent: a typed intent plus an optional free-text
/// description and priority, used by the alignment scorer's goal-compatibility
/// strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    #[serde(rename = "type")]
    pub goal_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<u8>,
}

impl Goal {
    pub fn new(goal_type: impl Into<String>) -> Self {
        Self {
            goal_type: goal_type.into(),
            description: String::new(),
            priority: None,
        }
    }
}

/// Describes one participant in a collaboration: what it knows, what it
/// wants, the vocabulary it uses, the assumptions it carries, and the
/// context it currently operates under.
///
/// Owned by the Orchestrator's agent registry. Created by `register_agent`,
/// mutated only through explicit update calls, and removed on
/// `deregister_agent`. `agent_id` must be unique within a registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDescriptor {
    pub agent_id: String,

    #[serde(default)]
    pub knowledge_domains: Vec<String>,

    /// Per-domain expertise in [0, 1]. Domains without an entry are treated
    /// as declared-but-unrated.
    #[serde(default)]
    pub expertise_level: HashMap<String, f64>,

    #[serde(default)]
    pub goals: Vec<Goal>,

    /// term -> definition
    #[serde(default)]
    pub terminology: HashMap<String, String>,

    #[serde(default)]
    pub assumptions: Vec<String>,

    /// key -> value, compared structurally (via JSON value equality) during
    /// context synchronization.
    #[serde(default)]
    pub context_params: HashMap<String, serde_json::Value>,

    /// name -> value, consulted by negotiation auto-optimization and the
    /// orchestrator's capability-aware upgrade of proposed params.
    #[serde(default)]
    pub capabilities: HashMap<String, serde_json::Value>,
}

impl AgentDescriptor {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            knowledge_domains: Vec::new(),
            expertise_level: HashMap::new(),
            goals: Vec::new(),
            terminology: HashMap::new(),
            assumptions: Vec::new(),
            context_params: HashMap::new(),
            capabilities: HashMap::new(),
        }
    }

    /// Checks whether a capability is present and "truthy" (boolean `true`,
    /// non-empty string, or non-zero number) — used when optimizing
    /// negotiation params for a `high_throughput`/`msgpack`-style flag.
    pub fn has_capability(&self, name: &str) -> bool {
        match self.capabilities.get(name) {
            None => false,
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(serde_json::Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
            Some(_) => true,
        }
    }

    pub fn capability_str(&self, name: &str) -> Option<&str> {
        self.capabilities.get(name).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_descriptor_is_empty() {
        let a = AgentDescriptor::new("agent-a");
        assert_eq!(a.agent_id, "agent-a");
        assert!(a.knowledge_domains.is_empty());
        assert!(a.goals.is_empty());
    }

    #[test]
    fn has_capability_checks_truthiness() {
        let mut a = AgentDescriptor::new("a");
        a.capabilities.insert("msgpack".into(), serde_json::json!(true));
        a.capabilities.insert("empty".into(), serde_json::json!(""));
        a.capabilities.insert("zero".into(), serde_json::json!(0));
        assert!(a.has_capability("msgpack"));
        assert!(!a.has_capability("empty"));
        assert!(!a.has_capability("zero"));
        assert!(!a.has_capability("missing"));
    }
}
