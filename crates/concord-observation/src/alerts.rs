//! Rule-driven alerting over published flow events.

use chrono::{DateTime, Utc};
use concord_core::{FlowType, Severity};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::flow_event::FlowEvent;
use crate::ring::Ring;

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub alert_id: String,
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
    pub event_id: String,
    pub created_at: DateTime<Utc>,
}

/// A rule is a function from an event to an optional alert. Built-in
/// rules cover the three cases named in the design; callers may add
/// more via `AlertManager::add_rule`.
pub trait AlertRule: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, event: &FlowEvent) -> Option<Alert>;
}

struct CriticalSeverityRule;
impl AlertRule for CriticalSeverityRule {
    fn name(&self) -> &str {
        "critical_severity"
    }
    fn evaluate(&self, event: &FlowEvent) -> Option<Alert> {
        if event.severity == Severity::Critical {
            Some(Alert {
                alert_id: Uuid::new_v4().to_string(),
                rule_name: self.name().to_string(),
                severity: Severity::Critical,
                message: format!("critical event: {}", event.summary),
                event_id: event.event_id.clone(),
                created_at: Utc::now(),
            })
        } else {
            None
        }
    }
}

struct RollbackNameRule;
impl AlertRule for RollbackNameRule {
    fn name(&self) -> &str {
        "rollback_name"
    }
    fn evaluate(&self, event: &FlowEvent) -> Option<Alert> {
        if event.event_name.contains("rollback") {
            Some(Alert {
                alert_id: Uuid::new_v4().to_string(),
                rule_name: self.name().to_string(),
                severity: Severity::Warning,
                message: format!("rollback-related event: {}", event.event_name),
                event_id: event.event_id.clone(),
                created_at: Utc::now(),
            })
        } else {
            None
        }
    }
}

struct WorkflowErrorRule;
impl AlertRule for WorkflowErrorRule {
    fn name(&self) -> &str {
        "workflow_error"
    }
    fn evaluate(&self, event: &FlowEvent) -> Option<Alert> {
        if event.flow_type == FlowType::Workflow && event.severity == Severity::Error {
            Some(Alert {
                alert_id: Uuid::new_v4().to_string(),
                rule_name: self.name().to_string(),
                severity: Severity::Warning,
                message: format!("workflow error: {}", event.summary),
                event_id: event.event_id.clone(),
                created_at: Utc::now(),
            })
        } else {
            None
        }
    }
}

pub type AlertCallback = Box<dyn Fn(&Alert) + Send + Sync>;

/// Holds the rule set, a bounded ring of raised alerts, and registered
/// alert callbacks. Typically registered as a bus subscriber so it sees
/// every published event.
pub struct AlertManager {
    rules: Mutex<Vec<Box<dyn AlertRule>>>,
    alerts: Mutex<Ring<Alert>>,
    callbacks: Mutex<Vec<AlertCallback>>,
}

impl AlertManager {
    pub fn new(ring_capacity: usize) -> Self {
        Self {
            rules: Mutex::new(vec![
                Box::new(CriticalSeverityRule),
                Box::new(RollbackNameRule),
                Box::new(WorkflowErrorRule),
            ]),
            alerts: Mutex::new(Ring::new(ring_capacity)),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn add_rule(&self, rule: Box<dyn AlertRule>) {
        self.rules.lock().push(rule);
    }

    pub fn on_alert(&self, callback: AlertCallback) {
        self.callbacks.lock().push(callback);
    }

    /// Evaluates every rule against `event`; raised alerts are recorded
    /// and dispatched. Intended to be called from a bus subscriber
    /// closure, so it never runs while the bus's own lock is held.
    pub fn handle_event(&self, event: &FlowEvent) {
        let raised: Vec<Alert> = {
            let rules = self.rules.lock();
            rules.iter().filter_map(|r| r.evaluate(event)).collect()
        };
        if raised.is_empty() {
            return;
        }
        {
            let mut alerts = self.alerts.lock();
            for a in &raised {
                alerts.push(a.clone());
            }
        }
        let callbacks = self.callbacks.lock();
        for alert in &raised {
            for cb in callbacks.iter() {
                cb(alert);
            }
        }
    }

    pub fn recent(&self, n: usize) -> Vec<Alert> {
        self.alerts.lock().last_n(n).into_iter().cloned().collect()
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, severity: Severity, flow_type: FlowType) -> FlowEvent {
        FlowEvent::new(flow_type, name, severity, name)
    }

    #[test]
    fn critical_events_become_alerts() {
        let mgr = AlertManager::default();
        mgr.handle_event(&event("thing_happened", Severity::Critical, FlowType::System));
        assert_eq!(mgr.recent(10).len(), 1);
    }

    #[test]
    fn rollback_named_events_become_warnings() {
        let mgr = AlertManager::default();
        mgr.handle_event(&event("variant_rollback", Severity::Info, FlowType::Emergence));
        let alerts = mgr.recent(10);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Warning);
    }

    #[test]
    fn workflow_errors_become_warnings() {
        let mgr = AlertManager::default();
        mgr.handle_event(&event("step_failed", Severity::Error, FlowType::Workflow));
        assert_eq!(mgr.recent(10).len(), 1);
    }

    #[test]
    fn non_matching_events_raise_nothing() {
        let mgr = AlertManager::default();
        mgr.handle_event(&event("ok", Severity::Info, FlowType::System));
        assert!(mgr.recent(10).is_empty());
    }
}
