//! Message System
//!
//! Network-wide façade over one [`TopologyManager`]. Route lookups and
//! deliveries share a read lock; registration and rebuilds take the write
//! lock, so a rebuild never interleaves with an in-flight broadcast.

use mesh_events::{DeliveryReport, Message};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use super::relevance::RelevanceRule;
use super::topology::TopologyManager;
use crate::agents::AgentHandle;

/// Shared handle to a topology manager
pub type SharedTopology = Arc<RwLock<TopologyManager>>;

#[derive(Debug, Clone)]
pub struct MessageSystem {
    topology: SharedTopology,
}

impl MessageSystem {
    pub fn new(topology: TopologyManager) -> Self {
        Self {
            topology: Arc::new(RwLock::new(topology)),
        }
    }

    /// Wraps a topology already shared with other callers.
    pub fn from_shared(topology: SharedTopology) -> Self {
        Self { topology }
    }

    pub fn topology(&self) -> &SharedTopology {
        &self.topology
    }

    pub fn register_agent(&self, handle: AgentHandle) -> bool {
        self.topology.write().register_agent(handle)
    }

    pub fn unregister_agent(&self, agent_id: &str) -> Option<AgentHandle> {
        self.topology.write().unregister_agent(agent_id)
    }

    pub fn set_relevance_rules<I, S>(&self, agent_id: &str, patterns: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<RelevanceRule>,
    {
        self.topology.write().set_relevance_rules(agent_id, patterns)
    }

    /// Recomputes the neighbour graph; returns the edge count.
    pub fn rebuild_topology(&self) -> usize {
        self.topology.write().rebuild_topology()
    }

    /// Sends a point-to-point message along an existing edge.
    pub fn send(&self, from_id: &str, to_id: &str, kind: &str, payload: Value) -> DeliveryReport {
        let message = Message::new(kind, from_id, payload);
        self.topology.read().send_with_report(from_id, to_id, message)
    }

    /// Builds an envelope and delivers it to every neighbour of `from_id`.
    pub fn broadcast(&self, from_id: &str, kind: &str, payload: Value) -> DeliveryReport {
        self.broadcast_message(Message::new(kind, from_id, payload))
    }

    /// Delivers a prebuilt envelope to the sender's neighbours.
    pub fn broadcast_message(&self, message: Message) -> DeliveryReport {
        let from_id = message.sender_id.clone();
        self.topology.read().broadcast_with_report(&from_id, message)
    }

    /// Delivers to every other registered agent, ignoring edges.
    pub fn broadcast_all(&self, from_id: &str, kind: &str, payload: Value) -> DeliveryReport {
        let message = Message::new(kind, from_id, payload);
        self.topology.read().broadcast_all_with_report(from_id, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{into_handle, Agent};
    use serde_json::json;
    use std::thread;

    fn system() -> (MessageSystem, Vec<AgentHandle>) {
        let system = MessageSystem::new(TopologyManager::new());
        let mut handles = Vec::new();
        for (id, belief, rule) in [
            ("agent-1", "Weather: Sunny", "Weather"),
            ("agent-2", "Weather: Sunny", "Weather"),
            ("agent-3", "Sports: Football", "Sports"),
        ] {
            let mut agent = Agent::new(id, id);
            agent.add_belief(belief, 0.8, "seed", &[]).unwrap();
            let handle = into_handle(agent);
            assert!(system.register_agent(handle.clone()));
            assert!(system.set_relevance_rules(id, [rule]));
            handles.push(handle);
        }
        system.rebuild_topology();
        (system, handles)
    }

    #[test]
    fn test_broadcast_merges_at_neighbours() {
        let (system, handles) = system();
        let report = system.broadcast(
            "agent-1",
            "belief_update",
            json!({ "proposition": "Weather: Sunny", "confidence": 0.4 }),
        );

        assert_eq!(report.delivered_count, 1);
        assert_eq!(report.recipients, vec!["agent-2"]);
        assert!(report.all_accepted());

        let confidence = handles[1]
            .read()
            .get_belief("Weather: Sunny")
            .unwrap()
            .confidence();
        assert!((confidence - 0.6).abs() < 1e-9);
        // The sender keeps its own value.
        assert_eq!(
            handles[0].read().get_belief("Weather: Sunny").unwrap().confidence(),
            0.8
        );
    }

    #[test]
    fn test_send_without_edge_delivers_nothing() {
        let (system, handles) = system();
        let report = system.send("agent-1", "agent-3", "query", json!({ "query_type": "get_all_beliefs" }));

        assert!(report.is_empty());
        assert!(handles[2].read().message_history().is_empty());
    }

    #[test]
    fn test_broadcast_all_reports_rejections() {
        let (system, _) = system();
        let report = system.broadcast_all("agent-3", "gossip", json!({ "text": "hi" }));

        assert_eq!(report.delivered_count, 2);
        assert_eq!(report.rejected.len(), 2);
        assert!(report.responses.is_empty());
    }

    #[test]
    fn test_unregister_then_rebuild() {
        let (system, _) = system();
        assert!(system.unregister_agent("agent-2").is_some());
        assert_eq!(system.rebuild_topology(), 0);

        let report = system.broadcast(
            "agent-1",
            "belief_update",
            json!({ "proposition": "Weather: Rain", "confidence": 0.5 }),
        );
        assert!(report.is_empty());
    }

    #[test]
    fn test_shared_topology_seen_by_driver() {
        let shared: SharedTopology = Arc::new(RwLock::new(TopologyManager::new()));
        let system = MessageSystem::from_shared(shared.clone());

        let mut agent = Agent::new("agent-1", "Ada");
        agent.add_belief("Weather: Sunny", 0.8, "seed", &[]).unwrap();
        assert!(system.register_agent(into_handle(agent)));

        assert!(Arc::ptr_eq(system.topology(), &shared));
        assert!(shared.read().get_agent("agent-1").is_some());
        assert!(shared.write().set_relevance_rules("agent-1", ["Weather"]));
        assert_eq!(system.topology().read().relevance_rules("agent-1").len(), 1);
    }

    #[test]
    fn test_concurrent_broadcasts_and_rebuilds() {
        let (system, handles) = system();

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let system = system.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        if i == 0 {
                            system.rebuild_topology();
                        } else {
                            system.broadcast(
                                "agent-2",
                                "belief_update",
                                json!({ "proposition": "Weather: Sunny", "confidence": 0.2 }),
                            );
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(handles[0].read().message_history().len(), 75);
        let topology = system.topology().read();
        assert!(topology.are_connected("agent-1", "agent-2"));
        assert_eq!(topology.edge_count(), 1);
    }
}
