//! Agent Registry
//!
//! Explicit id -> handle map owned by the driver and handed to the topology
//! layer. Handles are shared; the registry never decides an agent's lifetime.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::agent::Agent;

/// Shared, lock-guarded reference to an agent
pub type AgentHandle = Arc<RwLock<Agent>>;

/// Wraps an agent in a shareable handle.
pub fn into_handle(agent: Agent) -> AgentHandle {
    Arc::new(RwLock::new(agent))
}

/// Registered agents keyed by id, iterated in id order
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, AgentHandle>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle under its agent's id.
    ///
    /// Returns false and leaves the registry untouched if the id is taken.
    pub fn register(&mut self, handle: AgentHandle) -> bool {
        let id = handle.read().id().to_string();
        if self.agents.contains_key(&id) {
            return false;
        }
        self.agents.insert(id, handle);
        true
    }

    /// Removes and returns the handle for `agent_id`.
    pub fn remove(&mut self, agent_id: &str) -> Option<AgentHandle> {
        self.agents.remove(agent_id)
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentHandle> {
        self.agents.get(agent_id)
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AgentHandle)> {
        self.agents.iter().map(|(id, handle)| (id.as_str(), handle))
    }

    pub fn handles(&self) -> impl Iterator<Item = &AgentHandle> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
