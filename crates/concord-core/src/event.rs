//! Shared event vocabulary published onto the observation bus.
//!
//! Lives in `concord-core` rather than `concord-observation` because every
//! engine crate needs to tag the events it publishes with these enums, and
//! the bus itself must not depend on any engine crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The subsystem a `FlowEvent` originated from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    AgentLifecycle,
    Alignment,
    Negotiation,
    Emergence,
    Workflow,
    Collaboration,
    System,
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowType::AgentLifecycle => "agent_lifecycle",
            FlowType::Alignment => "alignment",
            FlowType::Negotiation => "negotiation",
            FlowType::Emergence => "emergence",
            FlowType::Workflow => "workflow",
            FlowType::Collaboration => "collaboration",
            FlowType::System => "system",
        };
        f.write_str(s)
    }
}

/// Severity of a `FlowEvent`, used both for display filtering and as the
/// comparand in alert-rule thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_by_escalation() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn flow_type_display_matches_wire_form() {
        assert_eq!(FlowType::AgentLifecycle.to_string(), "agent_lifecycle");
        assert_eq!(FlowType::Collaboration.to_string(), "collaboration");
    }
}
