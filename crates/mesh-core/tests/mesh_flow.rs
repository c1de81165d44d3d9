//! End-to-end flows across beliefs, agents, topology and messaging.

use mesh_core::{
    into_handle, Agent, AgentHandle, BeliefError, BeliefNetwork, MeshError, MessageSystem,
    RelevanceMode, TopologyManager,
};
use mesh_events::{fixtures, Message, MessageError, Query};
use serde_json::json;

fn agent(id: &str, beliefs: &[(&str, f64)]) -> AgentHandle {
    let mut agent = Agent::new(id, id);
    for (proposition, confidence) in beliefs {
        agent.add_belief(*proposition, *confidence, "observed", &[]).unwrap();
    }
    into_handle(agent)
}

#[test]
fn test_chain_update_propagates_to_every_dependent() {
    let mut network = BeliefNetwork::new("agent-1");
    network.add_belief("A", 0.9, "observed", &[]).unwrap();
    network.add_belief("B", 0.8, "follows A", &["A"]).unwrap();
    network.add_belief("C", 0.7, "follows B", &["B"]).unwrap();

    let changed = network.update_belief("A", 0.3, "r").unwrap();
    let props: Vec<&str> = changed.iter().map(|b| b.proposition()).collect();
    assert_eq!(props, vec!["A", "B", "C"]);
    assert!(changed.iter().all(|b| b.confidence() == 0.3));
}

#[test]
fn test_rejected_updates_leave_state_untouched() {
    let mut network = BeliefNetwork::new("agent-1");
    network.add_belief("A", 0.9, "observed", &[]).unwrap();

    assert!(matches!(
        network.add_belief("A", 0.1, "again", &[]),
        Err(BeliefError::Duplicate { .. })
    ));
    assert!(matches!(
        network.update_belief("A", 1.5, "too sure"),
        Err(BeliefError::InvalidConfidence { .. })
    ));
    let belief = network.get_belief("A").unwrap();
    assert_eq!(belief.confidence(), 0.9);
    assert_eq!(belief.history().len(), 1);
}

#[test]
fn test_weather_mesh_end_to_end() {
    let handles = [
        agent("agent-1", &[("Weather: Sunny", 0.8)]),
        agent("agent-2", &[("Weather: Sunny", 0.4)]),
        agent("agent-3", &[("Sports: Football", 0.9)]),
    ];
    let system = MessageSystem::new(TopologyManager::new());
    for handle in &handles {
        assert!(system.register_agent(handle.clone()));
    }
    system.set_relevance_rules("agent-1", ["Weather"]);
    system.set_relevance_rules("agent-2", ["Weather"]);
    system.set_relevance_rules("agent-3", ["Sports"]);
    assert_eq!(system.rebuild_topology(), 1);

    {
        let topology = system.topology().read();
        assert_eq!(topology.get_neighbors("agent-1"), vec!["agent-2"]);
        assert_eq!(topology.get_neighbors("agent-2"), vec!["agent-1"]);
        assert!(topology.get_neighbors("agent-3").is_empty());
    }

    // agent-2 hears agent-1's 0.8 and merges with its own 0.4.
    let report = system.broadcast(
        "agent-1",
        "belief_update",
        json!({ "proposition": "Weather: Sunny", "confidence": 0.8, "justification": "clear" }),
    );
    assert_eq!(report.delivered_count, 1);
    let merged = handles[1]
        .read()
        .get_belief("Weather: Sunny")
        .unwrap()
        .confidence();
    assert!((merged - 0.6).abs() < 1e-9);

    // agent-3 is unreachable point-to-point, but reachable via broadcast_all.
    let report = system.send(
        "agent-1",
        "agent-3",
        "query",
        json!({ "query_type": "get_belief", "proposition": "Sports: Football" }),
    );
    assert!(report.is_empty());
    assert!(handles[2].read().message_history().is_empty());

    let report = system.broadcast_all(
        "agent-1",
        "query",
        json!({ "query_type": "get_belief", "proposition": "Sports: Football" }),
    );
    assert_eq!(report.delivered_count, 2);
    assert_eq!(handles[2].read().message_history().len(), 1);
}

#[test]
fn test_either_mode_connects_one_sided_interest() {
    let handles = [
        agent("agent-1", &[("Weather: Sunny", 0.8)]),
        agent("agent-2", &[("Sports: Football", 0.9)]),
    ];
    let mut manager = TopologyManager::with_mode(RelevanceMode::Either);
    for handle in &handles {
        manager.register_agent(handle.clone());
    }
    // Only agent-2 cares about the other's beliefs.
    manager.set_relevance_rules("agent-1", ["Markets"]);
    manager.set_relevance_rules("agent-2", ["Weather*"]);

    assert_eq!(manager.rebuild_topology(), 1);
    assert!(manager.are_connected("agent-1", "agent-2"));

    manager.set_mode(RelevanceMode::Mutual);
    assert_eq!(manager.rebuild_topology(), 0);
    assert_eq!(manager.get_relevant_agents("Weather forecast"), vec!["agent-2"]);
}

#[test]
fn test_agent_boundary_validation() {
    let handle = agent("agent-1", &[("Weather: Windy", 0.5)]);
    let mut agent = handle.write();

    let err = agent.receive_message(fixtures::gossip_message()).unwrap_err();
    assert!(matches!(err, MeshError::Message(MessageError::Unsupported { .. })));

    let err = agent.receive_message(fixtures::malformed_update()).unwrap_err();
    assert!(matches!(err, MeshError::Message(MessageError::Malformed { .. })));

    let err = agent
        .receive_message(Message::belief_update("agent-2", "Weather: Windy", -0.1, "?"))
        .unwrap_err();
    assert!(matches!(err, MeshError::Belief(BeliefError::InvalidConfidence { .. })));

    // Every attempt is still on record.
    assert_eq!(agent.message_history().len(), 3);
    assert_eq!(agent.get_belief("Weather: Windy").unwrap().confidence(), 0.5);

    let reply = agent
        .receive_message(Message::query("agent-2", Query::GetAllBeliefs))
        .unwrap();
    assert_eq!(reply.sender_id, "agent-1");
}
