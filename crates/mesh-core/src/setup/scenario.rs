//! Seeded Scenario
//!
//! Builds a reproducible agent population from `[scenario]` settings and
//! drives it in rounds: one agent revises a belief, shares it with its
//! neighbours, and the topology is rebuilt.

use mesh_events::{DeliveryReport, Message};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::agents::{into_handle, AgentHandle};
use crate::config::{MeshConfig, ScenarioConfig};
use crate::error::MeshError;
use crate::output::{MeshSnapshot, MessageJournal};
use crate::routing::MessageSystem;

/// Facets combined with topics to form propositions, e.g. "Weather: Rising"
const FACETS: &[&str] = &["Rising", "Falling", "Stable", "Uncertain"];

/// Chance that a seeded belief depends on the one seeded before it
const DEPENDENCY_CHANCE: f64 = 0.5;

/// What happened in one round
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round: u32,
    /// Agent that revised a belief, if any agent held one
    pub speaker: Option<String>,
    pub proposition: Option<String>,
    pub confidence: Option<f64>,
    /// Beliefs changed in the speaker's own network, root included
    pub cascaded: usize,
    /// Neighbour delivery of the revision
    pub delivery: Option<DeliveryReport>,
    /// Edges after the end-of-round rebuild
    pub edges: usize,
}

/// A seeded population of agents and the system connecting them
pub struct Scenario {
    settings: ScenarioConfig,
    rng: SmallRng,
    system: MessageSystem,
    agents: Vec<AgentHandle>,
    round: u32,
}

impl Scenario {
    /// Seeds agents, beliefs and rules, then builds the first topology.
    pub fn from_config(config: &MeshConfig) -> Result<Self, MeshError> {
        let settings = config.scenario.clone();
        let mut rng = SmallRng::seed_from_u64(settings.seed);
        let system = MessageSystem::new(config.topology_manager());

        let pool: Vec<String> = settings
            .topics
            .iter()
            .flat_map(|topic| FACETS.iter().map(move |facet| format!("{}: {}", topic, facet)))
            .collect();

        let mut agents = Vec::with_capacity(settings.agent_count);
        for i in 0..settings.agent_count {
            let id = format!("agent-{:03}", i + 1);
            let mut agent = config.new_agent(id.clone(), format!("Agent {}", i + 1));

            let mut previous: Option<&str> = None;
            for proposition in pool.choose_multiple(&mut rng, settings.beliefs_per_agent) {
                let confidence: f64 = rng.gen_range(0.05..0.95);
                let deps: Vec<&str> = match previous {
                    Some(p) if rng.gen_bool(DEPENDENCY_CHANCE) => vec![p],
                    _ => Vec::new(),
                };
                agent.add_belief(proposition.as_str(), confidence, "seeded", &deps)?;
                previous = Some(proposition.as_str());
            }

            let topics: Vec<&String> = settings
                .topics
                .choose_multiple(&mut rng, settings.rules_per_agent)
                .collect();
            for topic in &topics {
                agent.subscribe(topic.to_lowercase());
            }

            let handle = into_handle(agent);
            system.register_agent(handle.clone());
            system.set_relevance_rules(&id, topics.iter().map(|t| format!("{}*", t)));
            agents.push(handle);
        }

        let edges = system.rebuild_topology();
        tracing::info!(
            seed = settings.seed,
            agents = agents.len(),
            edges,
            "scenario seeded"
        );

        Ok(Self {
            settings,
            rng,
            system,
            agents,
            round: 0,
        })
    }

    pub fn system(&self) -> &MessageSystem {
        &self.system
    }

    /// Agents in creation order.
    pub fn agents(&self) -> &[AgentHandle] {
        &self.agents
    }

    /// Rounds completed so far.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Runs one round, journaling neighbour deliveries.
    pub fn step(&mut self, journal: &mut MessageJournal) -> Result<RoundSummary, MeshError> {
        self.round += 1;
        let mut summary = RoundSummary {
            round: self.round,
            speaker: None,
            proposition: None,
            confidence: None,
            cascaded: 0,
            delivery: None,
            edges: 0,
        };

        if let Some(handle) = self.agents.choose(&mut self.rng) {
            let revision = {
                let mut agent = handle.write();
                let propositions: Vec<String> =
                    agent.network().propositions().map(str::to_string).collect();
                match propositions.choose(&mut self.rng) {
                    Some(proposition) => {
                        let confidence: f64 = self.rng.gen_range(0.0..1.0);
                        let justification = format!("revised in round {}", self.round);
                        let changed = agent.update_belief(proposition, confidence, justification.as_str())?;
                        let message = Message::belief_update(
                            agent.id(),
                            proposition.as_str(),
                            confidence,
                            justification,
                        );
                        summary.speaker = Some(agent.id().to_string());
                        summary.proposition = Some(proposition.clone());
                        summary.confidence = Some(confidence);
                        summary.cascaded = changed.len();
                        Some(message)
                    }
                    None => None,
                }
            };

            // The speaker's lock is released before delivery.
            if let Some(message) = revision {
                let report = self.system.broadcast_message(message.clone());
                journal.record_delivery(&message, &report)?;
                summary.delivery = Some(report);
            }
        }

        summary.edges = self.system.rebuild_topology();
        tracing::debug!(
            round = summary.round,
            speaker = ?summary.speaker,
            edges = summary.edges,
            "round complete"
        );
        Ok(summary)
    }

    /// Runs the configured number of rounds.
    pub fn run(&mut self, journal: &mut MessageJournal) -> Result<Vec<RoundSummary>, MeshError> {
        (0..self.settings.rounds).map(|_| self.step(journal)).collect()
    }

    pub fn snapshot(&self) -> MeshSnapshot {
        MeshSnapshot::capture(&self.system.topology().read())
    }
}
