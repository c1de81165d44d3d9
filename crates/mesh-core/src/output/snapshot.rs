//! Snapshots
//!
//! Serializable captures of networks, agents, and the topology, and the
//! loaders that rehydrate them. Loaders enforce what `add_belief` enforces;
//! histories and update logs are taken as recorded.

use mesh_events::{now_millis, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::agents::{into_handle, Agent};
use crate::beliefs::{Belief, PropagationStrategy, UpdateLogEntry};
use crate::error::BeliefError;
use crate::routing::{RelevanceMode, TopologyManager};

/// Beliefs, dependency edges and update log of one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub agent_id: String,
    #[serde(default)]
    pub strategy: PropagationStrategy,
    pub beliefs: Vec<Belief>,
    /// proposition -> propositions it depends on
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub update_log: Vec<UpdateLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub name: String,
    pub network: NetworkSnapshot,
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

/// Registered agents, adjacency and rule sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub relevance_mode: RelevanceMode,
    pub agents: Vec<String>,
    #[serde(default)]
    pub topology: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub relevance_rules: BTreeMap<String, Vec<String>>,
}

/// Full state of a mesh at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub generated_at: Timestamp,
    pub agents: Vec<AgentSnapshot>,
    pub topology: TopologySnapshot,
}

impl MeshSnapshot {
    /// Captures every registered agent and the topology.
    pub fn capture(manager: &TopologyManager) -> Self {
        Self {
            generated_at: now_millis(),
            agents: manager
                .agents()
                .handles()
                .map(|handle| handle.read().snapshot())
                .collect(),
            topology: manager.snapshot(),
        }
    }

    /// Rebuilds agents and the topology manager holding them.
    pub fn restore(self) -> Result<TopologyManager, SnapshotError> {
        let handles = self
            .agents
            .into_iter()
            .map(|snapshot| Agent::from_snapshot(snapshot).map(into_handle))
            .collect::<Result<Vec<_>, _>>()?;
        let manager = TopologyManager::from_snapshot(self.topology, handles)?;
        tracing::info!(
            agents = manager.agents().len(),
            edges = manager.edge_count(),
            "mesh restored"
        );
        Ok(manager)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_json_compact(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes pretty JSON to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), agents = self.agents.len(), "snapshot written");
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Errors from capturing, storing or restoring snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid belief state: {0}")]
    Belief(#[from] BeliefError),
    #[error("snapshot references unknown agent: {0}")]
    UnknownAgent(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentHandle;
    use mesh_events::Message;

    fn mesh() -> (TopologyManager, Vec<AgentHandle>) {
        let mut manager = TopologyManager::new();
        let mut handles = Vec::new();
        for (id, rule) in [("agent-1", "Weather"), ("agent-2", "Weather*")] {
            let mut agent = Agent::new(id, id.to_uppercase());
            agent.add_belief("Weather: Sunny", 0.8, "clear", &[]).unwrap();
            agent
                .add_belief("Picnic", 0.7, "if sunny", &["Weather: Sunny"])
                .unwrap();
            agent.subscribe("weather");
            let handle = into_handle(agent);
            manager.register_agent(handle.clone());
            manager.set_relevance_rules(id, [rule]);
            handles.push(handle);
        }
        manager.rebuild_topology();
        (manager, handles)
    }

    #[test]
    fn test_capture_and_restore() {
        let (manager, handles) = mesh();
        handles[0]
            .write()
            .update_belief("Weather: Sunny", 0.2, "clouds")
            .unwrap();

        let restored = MeshSnapshot::capture(&manager).restore().unwrap();
        assert!(restored.are_connected("agent-1", "agent-2"));
        assert_eq!(restored.relevance_rules("agent-2")[0].pattern(), "Weather*");

        let agent = restored.get_agent("agent-1").unwrap().read();
        assert_eq!(agent.name(), "AGENT-1");
        assert!(agent.is_subscribed("weather"));
        assert_eq!(agent.get_belief("Picnic").unwrap().confidence(), 0.2);
        assert_eq!(agent.get_belief("Weather: Sunny").unwrap().history().len(), 2);
        assert_eq!(agent.network().get_dependencies("Picnic").len(), 1);
        assert_eq!(
            agent.network().update_log().len(),
            handles[0].read().network().update_log().len()
        );
    }

    #[test]
    fn test_restored_network_still_propagates() {
        let (manager, _) = mesh();
        let restored = MeshSnapshot::capture(&manager).restore().unwrap();

        let changed = restored
            .get_agent("agent-2")
            .unwrap()
            .write()
            .update_belief("Weather: Sunny", 0.1, "storm")
            .unwrap();
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn test_message_history_not_captured() {
        let (manager, handles) = mesh();
        manager.send_to(
            "agent-1",
            "agent-2",
            Message::belief_update("agent-1", "Weather: Sunny", 0.4, "haze"),
        );
        assert_eq!(handles[1].read().message_history().len(), 1);

        let restored = MeshSnapshot::capture(&manager).restore().unwrap();
        assert!(restored
            .get_agent("agent-2")
            .unwrap()
            .read()
            .message_history()
            .is_empty());
    }

    #[test]
    fn test_json_roundtrip() {
        let (manager, _) = mesh();
        let snapshot = MeshSnapshot::capture(&manager);

        let parsed = MeshSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
        let compact = snapshot.to_json_compact().unwrap();
        assert!(!compact.contains('\n'));
        assert_eq!(MeshSnapshot::from_json(&compact).unwrap(), snapshot);
    }

    #[test]
    fn test_dangling_dependency_rejected() {
        let (manager, _) = mesh();
        let mut snapshot = MeshSnapshot::capture(&manager);
        snapshot.agents[0]
            .network
            .dependencies
            .insert("Picnic".to_string(), vec!["Rain".to_string()]);

        assert!(matches!(
            snapshot.restore(),
            Err(SnapshotError::Belief(BeliefError::MissingDependency { missing, .. })) if missing == "Rain"
        ));
    }

    #[test]
    fn test_write_and_read_file() {
        let (manager, _) = mesh();
        let snapshot = MeshSnapshot::capture(&manager);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mesh.json");
        snapshot.write_to(&path).unwrap();

        assert_eq!(MeshSnapshot::read_from(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_read_missing_file() {
        let err = MeshSnapshot::read_from(Path::new("/nonexistent/mesh.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io(_)));
    }
}
