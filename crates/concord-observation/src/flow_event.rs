//! The structured record every subsystem publishes onto the bus.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use concord_core::{FlowType, Severity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEvent {
    pub event_id: String,
    pub flow_type: FlowType,
    pub event_name: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub metrics: HashMap<String, serde_json::Value>,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

impl FlowEvent {
    /// Builds an event with required fields and everything else at its
    /// default; callers chain the `with_*` setters for the rest.
    pub fn new(flow_type: FlowType, event_name: impl Into<String>, severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            flow_type,
            event_name: event_name.into(),
            timestamp: Utc::now(),
            severity,
            source_agent: None,
            target_agent: None,
            session_id: None,
            metrics: HashMap::new(),
            summary: summary.into(),
            tags: Vec::new(),
            parent_event_id: None,
            duration_ms: None,
        }
    }

    pub fn with_source_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.source_agent = Some(agent_id.into());
        self
    }

    pub fn with_target_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.target_agent = Some(agent_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_optional_fields() {
        let ev = FlowEvent::new(FlowType::Negotiation, "session_opened", Severity::Info, "opened")
            .with_source_agent("A")
            .with_target_agent("B")
            .with_session_id("sess-1");
        assert_eq!(ev.source_agent.as_deref(), Some("A"));
        assert_eq!(ev.target_agent.as_deref(), Some("B"));
        assert_eq!(ev.session_id.as_deref(), Some("sess-1"));
        assert_eq!(ev.flow_type, FlowType::Negotiation);
    }
}
