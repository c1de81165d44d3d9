//! Topology Manager
//!
//! Holds relevance rules per agent, derives the undirected neighbour graph
//! from them, and routes messages along its edges.
//!
//! The adjacency map is always symmetric: `b` is in `a`'s neighbour set iff
//! `a` is in `b`'s. Rebuilding clears every edge before recomputing, and
//! unregistering an agent purges its edges and rules.

use mesh_events::{DeliveryReport, Message};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::relevance::{any_rule_matches, is_relevant, RelevanceMode, RelevanceRule};
use crate::agents::{AgentHandle, AgentRegistry};
use crate::output::{SnapshotError, TopologySnapshot};

/// Aggregate view of the current topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyStats {
    pub agent_count: usize,
    pub edge_count: usize,
    /// Registered agents with no neighbours
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub isolated_agents: Vec<String>,
}

/// Relevance-driven neighbour graph over registered agents
#[derive(Debug, Default)]
pub struct TopologyManager {
    agents: AgentRegistry,
    topology: BTreeMap<String, BTreeSet<String>>,
    relevance_rules: BTreeMap<String, BTreeSet<RelevanceRule>>,
    mode: RelevanceMode,
}

impl TopologyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: RelevanceMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Builds a manager over an existing registry. No edges exist until
    /// the first rebuild.
    pub fn with_registry(agents: AgentRegistry, mode: RelevanceMode) -> Self {
        let topology = agents
            .ids()
            .map(|id| (id.to_string(), BTreeSet::new()))
            .collect();
        Self {
            agents,
            topology,
            relevance_rules: BTreeMap::new(),
            mode,
        }
    }

    pub fn mode(&self) -> RelevanceMode {
        self.mode
    }

    /// Changes the edge rule. Takes effect on the next rebuild.
    pub fn set_mode(&mut self, mode: RelevanceMode) {
        self.mode = mode;
    }

    // --- Registration ---

    /// Registers an agent. Returns false if its id is already registered.
    pub fn register_agent(&mut self, handle: AgentHandle) -> bool {
        let id = handle.read().id().to_string();
        if !self.agents.register(handle) {
            tracing::warn!(agent = %id, "agent already registered");
            return false;
        }
        self.topology.entry(id.clone()).or_default();
        tracing::info!(agent = %id, "agent registered");
        true
    }

    /// Unregisters an agent, dropping its edges and rules.
    pub fn unregister_agent(&mut self, agent_id: &str) -> Option<AgentHandle> {
        let handle = self.agents.remove(agent_id)?;
        self.topology.remove(agent_id);
        for neighbours in self.topology.values_mut() {
            neighbours.remove(agent_id);
        }
        self.relevance_rules.remove(agent_id);
        tracing::info!(agent = %agent_id, "agent unregistered");
        Some(handle)
    }

    pub fn get_agent(&self, agent_id: &str) -> Option<&AgentHandle> {
        self.agents.get(agent_id)
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = &str> {
        self.agents.ids()
    }

    // --- Relevance rules ---

    /// Replaces an agent's rule set. Returns false for unknown agents.
    pub fn set_relevance_rules<I, S>(&mut self, agent_id: &str, patterns: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<RelevanceRule>,
    {
        if !self.agents.contains(agent_id) {
            return false;
        }
        let rules: BTreeSet<RelevanceRule> = patterns.into_iter().map(Into::into).collect();
        self.relevance_rules.insert(agent_id.to_string(), rules);
        true
    }

    /// Adds one rule to an agent's set. Returns false for unknown agents.
    pub fn add_relevance_rule(&mut self, agent_id: &str, pattern: impl Into<RelevanceRule>) -> bool {
        if !self.agents.contains(agent_id) {
            return false;
        }
        self.relevance_rules
            .entry(agent_id.to_string())
            .or_default()
            .insert(pattern.into());
        true
    }

    /// The agent's rules, sorted.
    pub fn relevance_rules(&self, agent_id: &str) -> Vec<&RelevanceRule> {
        self.relevance_rules
            .get(agent_id)
            .map(|rules| rules.iter().collect())
            .unwrap_or_default()
    }

    /// Agents whose rules match `text`, independent of edges.
    pub fn get_relevant_agents(&self, text: &str) -> Vec<String> {
        self.relevance_rules
            .iter()
            .filter(|(id, rules)| self.agents.contains(id) && any_rule_matches(rules.iter(), text))
            .map(|(id, _)| id.clone())
            .collect()
    }

    // --- Topology ---

    /// Recomputes every edge from current beliefs and rules.
    ///
    /// Returns the number of undirected edges.
    pub fn rebuild_topology(&mut self) -> usize {
        self.clear_topology();

        let propositions: Vec<(String, Vec<String>)> = self
            .agents
            .iter()
            .map(|(id, handle)| {
                let agent = handle.read();
                (
                    id.to_string(),
                    agent.network().propositions().map(str::to_string).collect(),
                )
            })
            .collect();

        let no_rules = BTreeSet::new();
        let mut pairs = Vec::new();
        for (i, (a, a_props)) in propositions.iter().enumerate() {
            let a_rules = self.relevance_rules.get(a).unwrap_or(&no_rules);
            for (b, b_props) in propositions.iter().skip(i + 1) {
                let b_rules = self.relevance_rules.get(b).unwrap_or(&no_rules);

                // a cares about b when one of b's beliefs matches a's rules
                let a_wants_b = is_relevant(a_rules, b_props.iter().map(String::as_str));
                let b_wants_a = is_relevant(b_rules, a_props.iter().map(String::as_str));

                if self.mode.licenses(a_wants_b, b_wants_a) {
                    pairs.push((a, b));
                }
            }
        }

        let edges = pairs.len();
        for (a, b) in pairs {
            self.connect(a, b);
        }

        tracing::info!(
            agents = propositions.len(),
            edges,
            mode = ?self.mode,
            "topology rebuilt"
        );
        edges
    }

    fn connect(&mut self, a: &str, b: &str) {
        self.topology
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.topology
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    /// Drops every edge; rules and registrations stay.
    pub fn clear_topology(&mut self) {
        for neighbours in self.topology.values_mut() {
            neighbours.clear();
        }
    }

    /// Current neighbours of an agent, sorted.
    pub fn get_neighbors(&self, agent_id: &str) -> Vec<&str> {
        self.topology
            .get(agent_id)
            .map(|n| n.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        self.topology.get(a).is_some_and(|n| n.contains(b))
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.topology.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn stats(&self) -> TopologyStats {
        TopologyStats {
            agent_count: self.agents.len(),
            edge_count: self.edge_count(),
            isolated_agents: self
                .agents
                .ids()
                .filter(|id| self.topology.get(*id).map_or(true, BTreeSet::is_empty))
                .map(str::to_string)
                .collect(),
        }
    }

    // --- Routing ---

    /// Sends a message along an existing edge.
    ///
    /// Returns false, without touching the target, if either agent is
    /// unknown or the two are not neighbours.
    pub fn send_to(&self, from_id: &str, to_id: &str, message: Message) -> bool {
        self.send_with_report(from_id, to_id, message).delivered_count == 1
    }

    /// Like [`send_to`](Self::send_to), reporting the target's reply.
    pub fn send_with_report(&self, from_id: &str, to_id: &str, message: Message) -> DeliveryReport {
        let mut report = DeliveryReport::new(&message);
        if !self.agents.contains(from_id) || !self.are_connected(from_id, to_id) {
            tracing::warn!(from = %from_id, to = %to_id, "no route");
            return report;
        }
        if let Some(target) = self.agents.get(to_id) {
            self.dispatch(to_id, target, message, &mut report);
        }
        report
    }

    /// Delivers to every current neighbour of `from_id`.
    pub fn broadcast(&self, from_id: &str, message: Message) -> usize {
        self.broadcast_with_report(from_id, message).delivered_count
    }

    pub fn broadcast_with_report(&self, from_id: &str, message: Message) -> DeliveryReport {
        let targets: Vec<&str> = if self.agents.contains(from_id) {
            self.get_neighbors(from_id)
        } else {
            Vec::new()
        };
        self.deliver_all(&targets, message)
    }

    /// Delivers to every other registered agent, ignoring edges.
    pub fn broadcast_all(&self, from_id: &str, message: Message) -> usize {
        self.broadcast_all_with_report(from_id, message).delivered_count
    }

    pub fn broadcast_all_with_report(&self, from_id: &str, message: Message) -> DeliveryReport {
        let targets: Vec<&str> = if self.agents.contains(from_id) {
            self.agents.ids().filter(|id| *id != from_id).collect()
        } else {
            Vec::new()
        };
        self.deliver_all(&targets, message)
    }

    fn deliver_all(&self, targets: &[&str], message: Message) -> DeliveryReport {
        let mut report = DeliveryReport::new(&message);
        for id in targets {
            if let Some(target) = self.agents.get(id) {
                self.dispatch(id, target, message.clone(), &mut report);
            }
        }
        tracing::debug!(
            sender = %report.sender_id,
            delivered = report.delivered_count,
            rejected = report.rejected.len(),
            "broadcast delivered"
        );
        report
    }

    fn dispatch(&self, to_id: &str, target: &AgentHandle, message: Message, report: &mut DeliveryReport) {
        let mut agent = target.write();
        match agent.receive_message(message) {
            Ok(reply) => report.record_response(to_id, reply),
            Err(e) => report.record_rejection(to_id, e.to_string()),
        }
    }

    // --- Persistence ---

    /// Captures agent ids, adjacency, rules and the relevance mode.
    pub fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot {
            relevance_mode: self.mode,
            agents: self.agents.ids().map(str::to_string).collect(),
            topology: self
                .topology
                .iter()
                .map(|(id, n)| (id.clone(), n.iter().cloned().collect()))
                .collect(),
            relevance_rules: self
                .relevance_rules
                .iter()
                .map(|(id, rules)| (id.clone(), rules.iter().map(|r| r.pattern().to_string()).collect()))
                .collect(),
        }
    }

    /// Rebuilds a manager from a snapshot and the agents it names.
    ///
    /// Every id in the snapshot must be among `handles`. Restored edges are
    /// made symmetric.
    pub fn from_snapshot(
        snapshot: TopologySnapshot,
        handles: impl IntoIterator<Item = AgentHandle>,
    ) -> Result<Self, SnapshotError> {
        let mut manager = Self::with_mode(snapshot.relevance_mode);
        for handle in handles {
            manager.register_agent(handle);
        }

        let known = |id: &str| -> Result<(), SnapshotError> {
            if manager.agents.contains(id) {
                Ok(())
            } else {
                Err(SnapshotError::UnknownAgent(id.to_string()))
            }
        };
        for id in &snapshot.agents {
            known(id)?;
        }
        for id in snapshot.relevance_rules.keys() {
            known(id)?;
        }
        let mut edges = Vec::new();
        for (id, neighbours) in &snapshot.topology {
            known(id)?;
            for n in neighbours {
                known(n)?;
                edges.push((id.as_str(), n.as_str()));
            }
        }

        for (id, patterns) in snapshot.relevance_rules {
            manager.set_relevance_rules(&id, patterns);
        }
        for (a, b) in edges {
            if a != b {
                manager.connect(a, b);
            }
        }
        Ok(manager)
    }
}
