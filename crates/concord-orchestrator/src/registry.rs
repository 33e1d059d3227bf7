//! The agent registry: owned by the Orchestrator, created by
//! `register_agent`, mutated only through explicit update calls.

use std::collections::HashMap;

use concord_core::{AgentDescriptor, ConcordError, ConcordResult};

#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, AgentDescriptor>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the descriptor for `agent_id`. Registering
    /// an already-known id replaces the prior descriptor wholesale.
    pub fn register(&mut self, descriptor: AgentDescriptor) -> AgentDescriptor {
        self.agents.insert(descriptor.agent_id.clone(), descriptor.clone());
        descriptor
    }

    pub fn get(&self, agent_id: &str) -> ConcordResult<AgentDescriptor> {
        self.agents.get(agent_id).cloned().ok_or_else(|| ConcordError::not_found(format!("agent {agent_id}")))
    }

    pub fn update(&mut self, descriptor: AgentDescriptor) -> ConcordResult<AgentDescriptor> {
        if !self.agents.contains_key(&descriptor.agent_id) {
            return Err(ConcordError::not_found(format!("agent {}", descriptor.agent_id)));
        }
        self.agents.insert(descriptor.agent_id.clone(), descriptor.clone());
        Ok(descriptor)
    }

    pub fn deregister(&mut self, agent_id: &str) -> ConcordResult<()> {
        self.agents.remove(agent_id).map(|_| ()).ok_or_else(|| ConcordError::not_found(format!("agent {agent_id}")))
    }

    pub fn exists(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn list(&self) -> Vec<AgentDescriptor> {
        self.agents.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_same_id_twice_overwrites() {
        let mut registry = AgentRegistry::new();
        registry.register(AgentDescriptor::new("a"));
        let mut updated = AgentDescriptor::new("a");
        updated.knowledge_domains.push("python".to_string());
        registry.register(updated);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().knowledge_domains, vec!["python".to_string()]);
    }

    #[test]
    fn update_requires_existing_agent() {
        let mut registry = AgentRegistry::new();
        let err = registry.update(AgentDescriptor::new("ghost")).unwrap_err();
        assert!(matches!(err, ConcordError::NotFound(_)));
    }
}
